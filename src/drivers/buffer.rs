use std::collections::VecDeque;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use crate::drivers::VitalsError;
/// Mean channel intensities over the ROI at one instant. Each value lies in `[0, 255]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelSample {
    pub timestamp_ms: u64,
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}
impl ChannelSample {
    pub fn zero(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            red: 0.0,
            green: 0.0,
            blue: 0.0,
        }
    }
}
/// Fixed-capacity FIFO ring: insertion ordered, oldest entry evicted on overflow.
#[derive(Clone, Debug)]
pub struct SignalBuffer<T> {
    data: VecDeque<T>,
    capacity: usize,
}
impl<T: Clone> SignalBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
    pub fn push(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        if self.data.len() == self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(value);
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }
    pub fn back(&self) -> Option<&T> {
        self.data.back()
    }
    pub fn to_vec(&self) -> Vec<T> {
        self.data.iter().cloned().collect()
    }
    /// The newest `count` entries, oldest first.
    pub fn tail(&self, count: usize) -> Vec<T> {
        let skip = self.data.len().saturating_sub(count);
        self.data.iter().skip(skip).cloned().collect()
    }
    pub fn clear(&mut self) {
        self.data.clear();
    }
}
/// Copy of the buffered channels, oldest sample first.
#[derive(Clone, Debug)]
pub struct ChannelSnapshot {
    pub sample_rate_hz: f64,
    pub timestamps_ms: Vec<u64>,
    pub red: Vec<f64>,
    pub green: Vec<f64>,
    pub blue: Vec<f64>,
}
impl ChannelSnapshot {
    pub fn len(&self) -> usize {
        self.green.len()
    }
    pub fn is_empty(&self) -> bool {
        self.green.is_empty()
    }
    /// True when all three colour channels carry the same number of samples.
    pub fn has_rgb(&self) -> bool {
        !self.green.is_empty()
            && self.red.len() == self.green.len()
            && self.blue.len() == self.green.len()
    }
    /// `samples x 3` matrix with columns red, green, blue.
    pub fn to_matrix(&self) -> Array2<f64> {
        let n = self.len();
        Array2::from_shape_fn((n, 3), |(i, c)| match c {
            0 => self.red.get(i).copied().unwrap_or(0.0),
            1 => self.green[i],
            _ => self.blue.get(i).copied().unwrap_or(0.0),
        })
    }
    pub fn duration_seconds(&self) -> f64 {
        self.len() as f64 / self.sample_rate_hz
    }
}
/// The red, green and blue rings plus the composite ring of full samples.
pub struct ChannelBuffers {
    red: SignalBuffer<f64>,
    green: SignalBuffer<f64>,
    blue: SignalBuffer<f64>,
    composite: SignalBuffer<ChannelSample>,
    sample_rate_hz: f64,
}
impl ChannelBuffers {
    pub fn with_history_seconds(
        sample_rate_hz: f64,
        history_seconds: f64,
    ) -> Result<Self, VitalsError> {
        if sample_rate_hz <= 0.0 {
            return Err(VitalsError::InvalidSampleRate);
        }
        let capacity = (sample_rate_hz * history_seconds).ceil() as usize;
        if capacity == 0 {
            return Err(VitalsError::InvalidConfig(
                "signal window holds no samples".into(),
            ));
        }
        Ok(Self {
            red: SignalBuffer::new(capacity),
            green: SignalBuffer::new(capacity),
            blue: SignalBuffer::new(capacity),
            composite: SignalBuffer::new(capacity),
            sample_rate_hz,
        })
    }
    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
    pub fn capacity(&self) -> usize {
        self.composite.capacity()
    }
    pub fn len(&self) -> usize {
        self.composite.len()
    }
    pub fn is_empty(&self) -> bool {
        self.composite.is_empty()
    }
    pub fn red_len(&self) -> usize {
        self.red.len()
    }
    pub fn push(&mut self, sample: ChannelSample) {
        self.red.push(sample.red);
        self.green.push(sample.green);
        self.blue.push(sample.blue);
        self.composite.push(sample);
    }
    pub fn latest(&self) -> Option<&ChannelSample> {
        self.composite.back()
    }
    pub fn composite(&self) -> &SignalBuffer<ChannelSample> {
        &self.composite
    }
    /// Green is the primary channel for single-channel analysis and for the raw trace.
    pub fn recent_green(&self, count: usize) -> Vec<f64> {
        self.green.tail(count)
    }
    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            sample_rate_hz: self.sample_rate_hz,
            timestamps_ms: self.composite.iter().map(|s| s.timestamp_ms).collect(),
            red: self.red.to_vec(),
            green: self.green.to_vec(),
            blue: self.blue.to_vec(),
        }
    }
    pub fn clear(&mut self) {
        self.red.clear();
        self.green.clear();
        self.blue.clear();
        self.composite.clear();
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn sample(i: u64) -> ChannelSample {
        ChannelSample {
            timestamp_ms: i,
            red: i as f64,
            green: i as f64 + 1.0,
            blue: i as f64 + 2.0,
        }
    }
    #[test]
    fn ring_evicts_oldest_first() {
        let mut ring = SignalBuffer::new(3);
        for i in 0..5 {
            ring.push(i);
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.to_vec(), vec![2, 3, 4]);
        assert_eq!(ring.tail(2), vec![3, 4]);
    }
    #[test]
    fn buffers_never_exceed_capacity() {
        let mut buffers = ChannelBuffers::with_history_seconds(30.0, 10.0).unwrap();
        assert_eq!(buffers.capacity(), 300);
        for i in 0..1000 {
            buffers.push(sample(i));
            assert!(buffers.len() <= 300);
        }
        let snap = buffers.snapshot();
        assert_eq!(snap.len(), 300);
        assert_eq!(snap.timestamps_ms.first(), Some(&700));
        assert_eq!(snap.timestamps_ms.last(), Some(&999));
        assert!(snap.timestamps_ms.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(snap.red[0], 700.0);
        assert_eq!(snap.blue[299], 1001.0);
    }
    #[test]
    fn rejects_non_positive_sample_rate() {
        assert!(matches!(
            ChannelBuffers::with_history_seconds(0.0, 10.0),
            Err(VitalsError::InvalidSampleRate)
        ));
    }
    #[test]
    fn matrix_columns_follow_channel_order() {
        let mut buffers = ChannelBuffers::with_history_seconds(10.0, 1.0).unwrap();
        buffers.push(sample(4));
        let matrix = buffers.snapshot().to_matrix();
        assert_eq!(matrix.shape(), &[1, 3]);
        assert_eq!(matrix[[0, 0]], 4.0);
        assert_eq!(matrix[[0, 1]], 5.0);
        assert_eq!(matrix[[0, 2]], 6.0);
    }
}
