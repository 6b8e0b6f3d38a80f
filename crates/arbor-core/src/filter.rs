//! The filter capability shared by every filter stage.
//!
//! Oscillators and analysers that need a filter (the neuron's DC blocker,
//! the wavetable mipmap builder) only depend on this trait, so any stage can
//! be swapped in.

/// A single-input, single-output filter stage.
pub trait Filter {
    /// Filter one sample.
    fn tick(&mut self, input: f32) -> f32;

    /// Clear internal state without touching coefficients.
    fn reset(&mut self);

    /// Filter a block in place.
    fn process_in_place(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.tick(*sample);
        }
    }
}

impl<F: Filter + ?Sized> Filter for &mut F {
    #[inline]
    fn tick(&mut self, input: f32) -> f32 {
        (**self).tick(input)
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}
