//! Scripted cue source and recording actuator for session tests

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use crate::error::{ConfigurationError, InputError, PerceptionError};
use crate::input::{Binding, InputActuator};
use crate::perception::cues::{Cue, Cues, MotionCue};

/// What the fake game surface currently shows
#[derive(Default)]
pub struct Screen {
    pub visible: HashSet<Cue>,
    pub moving: HashSet<MotionCue>,
    pub fish_name: String,
    pub capture_broken: bool,
    pub misconfigured: bool,
    pub window_lost: bool,
    /// Motion baselines dropped, in order
    pub motion_resets: Vec<MotionCue>,
    /// Perception calls made so far
    pub queries: u32,
}

impl Screen {
    fn failure(&self) -> Option<PerceptionError> {
        if self.misconfigured {
            Some(ConfigurationError::UnknownTemplate("bobber".into()).into())
        } else if self.capture_broken {
            Some(PerceptionError::Capture(anyhow::anyhow!("capture device lost")))
        } else {
            None
        }
    }
}

/// Cue source reading a shared scripted screen
pub struct FakeCues(pub Rc<RefCell<Screen>>);

impl Cues for FakeCues {
    fn check(&mut self, cue: Cue) -> Result<bool, PerceptionError> {
        let mut screen = self.0.borrow_mut();
        screen.queries += 1;
        if let Some(e) = screen.failure() {
            return Err(e);
        }
        Ok(screen.visible.contains(&cue))
    }

    fn moved(&mut self, cue: MotionCue, _sensitivity: f32) -> Result<bool, PerceptionError> {
        let mut screen = self.0.borrow_mut();
        screen.queries += 1;
        if let Some(e) = screen.failure() {
            return Err(e);
        }
        Ok(screen.moving.contains(&cue))
    }

    fn reset_motion(&mut self, cue: MotionCue) {
        self.0.borrow_mut().motion_resets.push(cue);
    }

    fn fish_name(&mut self) -> Result<String, PerceptionError> {
        let mut screen = self.0.borrow_mut();
        screen.queries += 1;
        Ok(screen.fish_name.clone())
    }

    fn revalidate(&mut self) -> Result<(), PerceptionError> {
        if self.0.borrow().window_lost {
            Err(PerceptionError::Capture(anyhow::anyhow!("game window not found")))
        } else {
            Ok(())
        }
    }
}

/// Actuator recording every command as text, e.g. `press SPACE` or `down LMB`
pub struct FakeActuator(pub Rc<RefCell<Vec<String>>>);

impl InputActuator for FakeActuator {
    fn press(&mut self, binding: &Binding) -> Result<(), InputError> {
        self.0.borrow_mut().push(format!("press {}", binding));
        Ok(())
    }

    fn key_down(&mut self, binding: &Binding) -> Result<(), InputError> {
        self.0.borrow_mut().push(format!("down {}", binding));
        Ok(())
    }

    fn release(&mut self, binding: &Binding) -> Result<(), InputError> {
        self.0.borrow_mut().push(format!("up {}", binding));
        Ok(())
    }

    fn hold(&mut self, binding: &Binding, _duration: Duration) -> Result<(), InputError> {
        self.0.borrow_mut().push(format!("hold {}", binding));
        Ok(())
    }
}
