use super::{
    ASPIRATION_WINDOW, LMR_BASE, LMR_BASE_MOVES, LMR_DIVISION, LMR_MIN_DEPTH, NMP_BASE_REDUCTION,
    NMP_REDUCTION_DEPTH_DIVISOR, RAZORING_COEFF_0, RAZORING_COEFF_1, RAZORING_DEPTH, RFP_DEPTH, RFP_MARGIN,
};

/// Tunable search constants, gathered so that a search can be run under different settings.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub aspiration_window: i32,
    pub rfp_margin: i32,
    pub rfp_depth: i32,
    pub nmp_base_reduction: i32,
    pub nmp_reduction_depth_divisor: i32,
    pub razoring_coeff_0: i32,
    pub razoring_coeff_1: i32,
    pub razoring_depth: i32,
    pub lmr_base: f64,
    pub lmr_division: f64,
    pub lmr_base_moves: usize,
    pub lmr_min_depth: i32,
}

impl Config {
    #[allow(clippy::should_implement_trait)]
    pub const fn default() -> Self {
        Self {
            aspiration_window: ASPIRATION_WINDOW,
            rfp_margin: RFP_MARGIN,
            rfp_depth: RFP_DEPTH,
            nmp_base_reduction: NMP_BASE_REDUCTION,
            nmp_reduction_depth_divisor: NMP_REDUCTION_DEPTH_DIVISOR,
            razoring_coeff_0: RAZORING_COEFF_0,
            razoring_coeff_1: RAZORING_COEFF_1,
            razoring_depth: RAZORING_DEPTH,
            lmr_base: LMR_BASE,
            lmr_division: LMR_DIVISION,
            lmr_base_moves: LMR_BASE_MOVES,
            lmr_min_depth: LMR_MIN_DEPTH,
        }
    }
}

