/// Coarse phase of an analysis request, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    DetectingPeople,
    CalculatingDensity,
    GeneratingHeatmap,
}

impl ProgressStage {
    pub fn from_percent(percent: u8) -> Self {
        if percent < 50 {
            ProgressStage::DetectingPeople
        } else if percent < 80 {
            ProgressStage::CalculatingDensity
        } else {
            ProgressStage::GeneratingHeatmap
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProgressStage::DetectingPeople => "Detecting people...",
            ProgressStage::CalculatingDensity => "Calculating density...",
            ProgressStage::GeneratingHeatmap => "Generating heatmap...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub percent: u8,
}

impl Progress {
    pub fn new(percent: u8) -> Self {
        Self {
            percent: percent.min(100),
        }
    }

    pub fn stage(&self) -> ProgressStage {
        ProgressStage::from_percent(self.percent)
    }

    pub fn is_done(&self) -> bool {
        self.percent >= 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_boundaries() {
        assert_eq!(Progress::new(40).stage(), ProgressStage::DetectingPeople);
        assert_eq!(Progress::new(50).stage(), ProgressStage::CalculatingDensity);
        assert_eq!(Progress::new(80).stage().label(), "Generating heatmap...");
    }

    #[test]
    fn percent_is_capped() {
        let done = Progress::new(150);
        assert_eq!(done.percent, 100);
        assert!(done.is_done());
    }
}
