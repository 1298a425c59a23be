//! Named cue queries the session machine asks of the perception engine

use crate::error::PerceptionError;

/// Yes/no facts read off the game surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    CastConfirmed,
    FishHooked,
    FishCaptured,
    LineSnagged,
    RetrievalComplete,
    Disconnected,
    EnergyLow,
    FishTagged,
}

impl Cue {
    pub const ALL: [Cue; 8] = [
        Cue::CastConfirmed,
        Cue::FishHooked,
        Cue::FishCaptured,
        Cue::LineSnagged,
        Cue::RetrievalComplete,
        Cue::Disconnected,
        Cue::EnergyLow,
        Cue::FishTagged,
    ];

    /// Template (and default region) the cue is matched against
    pub fn template(&self) -> &'static str {
        match self {
            Cue::CastConfirmed => "cast_indicator",
            Cue::FishHooked => "fish_hooked",
            Cue::FishCaptured => "fish_captured",
            Cue::LineSnagged => "line_snagged",
            Cue::RetrievalComplete => "retrieval_done",
            Cue::Disconnected => "disconnected",
            Cue::EnergyLow => "energy_low",
            Cue::FishTagged => "tag",
        }
    }

    /// Catch banners are drawn at a size that varies with the fish
    pub fn multi_scale(&self) -> bool {
        matches!(self, Cue::FishCaptured | Cue::FishTagged)
    }
}

/// Regions watched for movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionCue {
    RodTip,
    Float,
}

impl MotionCue {
    pub fn region(&self) -> &'static str {
        match self {
            MotionCue::RodTip => "rod_tip",
            MotionCue::Float => "float",
        }
    }
}

/// Region holding the fish name banner
pub const FISH_NAME_REGION: &str = "fish_name";

/// Perception as the session machine sees it
pub trait Cues {
    fn check(&mut self, cue: Cue) -> Result<bool, PerceptionError>;

    /// True when the region changed by more than `sensitivity` grey levels since the last query
    fn moved(&mut self, cue: MotionCue, sensitivity: f32) -> Result<bool, PerceptionError>;

    /// Drop the motion baseline, so the next `moved` query for the cue only records one
    fn reset_motion(&mut self, cue: MotionCue);

    /// Raw OCR text of the fish name banner, `""` when unreadable
    fn fish_name(&mut self) -> Result<String, PerceptionError>;

    /// Re-locate the game surface and re-check regions; used to recover from the Error state
    fn revalidate(&mut self) -> Result<(), PerceptionError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::templates::KNOWN_TEMPLATES;

    #[test]
    fn test_every_cue_has_a_known_template() {
        for cue in Cue::ALL {
            assert!(KNOWN_TEMPLATES.contains(&cue.template()), "{:?}", cue);
        }
    }

    #[test]
    fn test_multi_scale_cues() {
        assert!(Cue::FishCaptured.multi_scale());
        assert!(Cue::FishTagged.multi_scale());
        assert!(!Cue::FishHooked.multi_scale());
    }
}
