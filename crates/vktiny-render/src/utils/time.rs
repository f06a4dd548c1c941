const NANOS_PER_SEC: u32 = 1_000_000_000;

pub struct Timer {
    start: std::time::Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    pub fn get_elapsed_and_reset(&mut self) -> std::time::Duration {
        let elapsed = self.start.elapsed();
        self.start = std::time::Instant::now();
        elapsed
    }

    pub fn get_elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn get_fps(elapsed: &std::time::Duration) -> f32 {
    let elapsed = elapsed.as_nanos();
    NANOS_PER_SEC as f32 / elapsed as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps() {
        {
            let elapsed = std::time::Duration::from_secs(1);
            assert_eq!(get_fps(&elapsed), 1.0);
        }
        {
            let elapsed = std::time::Duration::from_millis(250);
            assert_eq!(get_fps(&elapsed), 4.0);
        }
    }

    #[test]
    fn test_timer_reset() {
        let mut timer = Timer::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let elapsed = timer.get_elapsed_and_reset();
        assert!(elapsed >= std::time::Duration::from_millis(5));
    }
}
