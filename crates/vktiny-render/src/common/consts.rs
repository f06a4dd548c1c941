pub const MAX_FRAMES_IN_FLIGHT: usize = 2;
