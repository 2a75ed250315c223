//! Per-sample processing capability shared by every stage in a chain

/// A unit in an audio chain that consumes one sample and returns one sample.
///
/// Implementations must be real-time safe: no allocation, locking or
/// blocking inside [`process_sample`](SampleProcessor::process_sample).
pub trait SampleProcessor {
    /// Process a single sample and return the sample to pass downstream
    fn process_sample(&mut self, sample: f32) -> f32;

    /// Process a buffer in place, one sample at a time
    fn process_buffer(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}

impl<P: SampleProcessor + ?Sized> SampleProcessor for Box<P> {
    fn process_sample(&mut self, sample: f32) -> f32 {
        (**self).process_sample(sample)
    }

    fn process_buffer(&mut self, buffer: &mut [f32]) {
        (**self).process_buffer(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Gain(f32);

    impl SampleProcessor for Gain {
        fn process_sample(&mut self, sample: f32) -> f32 {
            sample * self.0
        }
    }

    #[test]
    fn test_process_buffer_writes_in_place() {
        let mut gain = Gain(2.0);
        let mut buffer = [0.25f32, -0.5, 1.0];
        gain.process_buffer(&mut buffer);
        assert_eq!(buffer, [0.5, -1.0, 2.0]);
    }

    #[test]
    fn test_boxed_processor_chain() {
        let mut chain: Vec<Box<dyn SampleProcessor>> =
            vec![Box::new(Gain(2.0)), Box::new(Gain(0.5))];
        let out = chain
            .iter_mut()
            .fold(0.75f32, |sample, stage| stage.process_sample(sample));
        assert_eq!(out, 0.75);
    }
}
