//! Delay and sound timers.

/// The two countdown timers, decremented at 60Hz regardless of how many
/// instructions execute in between.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    /// (DT) Delay timer that counts down to 0.
    pub delay: u8,
    /// (ST) Sound timer that counts down to 0. A tone plays while it is non-zero.
    pub sound: u8,
}

impl Timers {
    /// Count down both timers by one, stopping at zero.
    ///
    /// Returns `true` when the sound timer crossed from 1 to 0 on this tick,
    /// which is the signal for the host to stop the tone.
    #[inline]
    pub fn tick(&mut self) -> bool {
        self.delay = countdown(self.delay);

        let sound = countdown(self.sound);
        let tone_stop = self.sound == 1 && sound == 0;
        self.sound = sound;

        tone_stop
    }

    /// Whether the tone should currently be playing.
    #[inline]
    pub fn is_sounding(&self) -> bool {
        self.sound > 0
    }
}

#[inline(always)]
fn countdown(value: u8) -> u8 {
    // The checked_sub implementation uses `unlikely!()` which degrades performance.
    let (val, underflow) = value.overflowing_sub(1);
    if underflow {
        value
    } else {
        val
    }
}
