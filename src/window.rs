//! Game window lookup using the Windows API

#[cfg(windows)]
use windows::core::PCWSTR;
#[cfg(windows)]
use windows::Win32::Foundation::{HWND, POINT, RECT};
#[cfg(windows)]
use windows::Win32::Graphics::Gdi::ClientToScreen;
#[cfg(windows)]
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, FindWindowW, GetClientRect, PeekMessageW, SetForegroundWindow, ShowWindow,
    TranslateMessage, MSG, PM_REMOVE, SW_SHOW,
};

use crate::perception::regions::Viewport;

/// Find a top-level window by exact title
#[cfg(windows)]
fn find_window(title: &str) -> Option<HWND> {
    let title_wide: Vec<u16> = title.encode_utf16().chain(std::iter::once(0)).collect();

    unsafe {
        let hwnd = FindWindowW(PCWSTR::null(), PCWSTR(title_wide.as_ptr())).ok()?;
        if hwnd.0.is_null() {
            None
        } else {
            Some(hwnd)
        }
    }
}

/// Client area of the window in screen coordinates
#[cfg(windows)]
pub fn get_client_box(title: &str) -> Option<Viewport> {
    let Some(hwnd) = find_window(title) else {
        tracing::debug!("Window '{}' not found.", title);
        return None;
    };

    unsafe {
        let mut rect = RECT::default();
        GetClientRect(hwnd, &mut rect).ok()?;

        let mut origin = POINT { x: 0, y: 0 };
        if !ClientToScreen(hwnd, &mut origin).as_bool() {
            return None;
        }

        let width = (rect.right - rect.left).max(0) as u32;
        let height = (rect.bottom - rect.top).max(0) as u32;
        if width == 0 || height == 0 {
            // minimised
            return None;
        }
        Some(Viewport::new(origin.x, origin.y, width, height))
    }
}

#[cfg(not(windows))]
pub fn get_client_box(_title: &str) -> Option<Viewport> {
    tracing::warn!("Window lookup not implemented on this platform");
    None
}

/// Bring the game window to the foreground. Returns false when it is not open.
#[cfg(windows)]
pub fn activate_window(title: &str) -> bool {
    let Some(hwnd) = find_window(title) else {
        tracing::warn!("Could not find '{}' window.", title);
        return false;
    };

    unsafe {
        let _ = ShowWindow(hwnd, SW_SHOW);
        let _ = SetForegroundWindow(hwnd);
    }
    tracing::info!("Activated '{}' window.", title);
    true
}

#[cfg(not(windows))]
pub fn activate_window(_title: &str) -> bool {
    tracing::warn!("Window focusing not implemented on this platform");
    false
}

/// Drain the thread's message queue. Global hotkeys are only delivered while the thread that
/// registered them pumps messages.
#[cfg(windows)]
pub fn pump_messages() {
    unsafe {
        let mut msg = MSG::default();
        while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

#[cfg(not(windows))]
pub fn pump_messages() {}
