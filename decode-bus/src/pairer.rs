use crate::frame::{Frame, FramePair};

/// Pairs every frame with its predecessor.
///
/// The first frame only primes the lookback slot, so the first pair carries
/// index 1 (the index of its current frame).
#[derive(Default)]
pub struct FramePairer {
    previous: Option<Frame>,
    next_index: u64,
}

impl FramePairer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) -> Option<(u64, FramePair)> {
        let index = self.next_index;
        self.next_index += 1;
        self.previous
            .replace(frame.clone())
            .map(|previous| (index, FramePair::new(previous, frame)))
    }

    /// Number of frames pushed so far.
    pub fn frames_seen(&self) -> u64 {
        self.next_index
    }

    pub fn previous(&self) -> Option<&Frame> {
        self.previous.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameGeometry;

    fn frame(value: u8) -> Frame {
        Frame::from_raw(FrameGeometry::new(1, 1).unwrap(), vec![value; 3]).unwrap()
    }

    #[test]
    fn test_first_frame_is_not_emitted() {
        let mut pairer = FramePairer::new();
        assert!(pairer.push(frame(0)).is_none());
        assert_eq!(pairer.frames_seen(), 1);
        assert_eq!(pairer.previous(), Some(&frame(0)));
    }

    #[test]
    fn test_pairs_are_consecutive() {
        let mut pairer = FramePairer::new();
        let mut pairs = Vec::new();
        for value in 0..5u8 {
            if let Some(pair) = pairer.push(frame(value)) {
                pairs.push(pair);
            }
        }

        assert_eq!(pairs.len(), 4);
        for (index, pair) in pairs {
            assert_eq!(pair.previous, frame(index as u8 - 1));
            assert_eq!(pair.current, frame(index as u8));
        }
    }

    #[test]
    fn test_current_is_shared_with_next_previous() {
        let mut pairer = FramePairer::new();
        pairer.push(frame(1));
        let (_, first) = pairer.push(frame(2)).unwrap();
        let (_, second) = pairer.push(frame(3)).unwrap();
        assert!(first.current.ptr_eq(&second.previous));
    }
}
