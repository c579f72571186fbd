use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One fully encoded training sample.
/// `decoder_input` and `label` have the same length; see `encoder.rs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarySample {
    pub encoder_input: Vec<u32>,
    pub decoder_input: Vec<u32>,
    pub label:         Vec<u32>,
}

pub struct SummaryDataset {
    samples: Vec<SummarySample>,
}

impl SummaryDataset {
    pub fn new(samples: Vec<SummarySample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<SummarySample> for SummaryDataset {
    fn get(&self, index: usize) -> Option<SummarySample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
