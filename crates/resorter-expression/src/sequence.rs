use std::sync::Mutex;

/// A monotonically increasing counter shared by every `counter` call of a
/// run.
///
/// The first call to [`Sequence::next`] fixes the start and step; later calls
/// ignore their arguments and keep stepping. [`Sequence::reset`] starts over.
#[derive(Debug, Default)]
pub struct Sequence {
    state: Mutex<Option<State>>,
}

#[derive(Debug, Clone, Copy)]
struct State {
    current: i64,
    step: i64,
}

impl Sequence {
    pub fn new() -> Self {
        Sequence::default()
    }

    pub fn next(&self, start: i64, step: i64) -> i64 {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.as_mut() {
            None => {
                *state = Some(State { current: start, step });
                start
            }
            Some(s) => {
                s.current = s.current.saturating_add(s.step);
                s.current
            }
        }
    }

    pub fn reset(&self) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_fixes_start_and_step() {
        let seq = Sequence::new();
        assert_eq!(seq.next(10, 5), 10);
        assert_eq!(seq.next(0, 1), 15);
        assert_eq!(seq.next(0, 1), 20);
        seq.reset();
        assert_eq!(seq.next(1, 1), 1);
        assert_eq!(seq.next(1, 1), 2);
    }
}
