use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        transformer::{
            TransformerDecoder, TransformerDecoderConfig, TransformerDecoderInput,
            TransformerEncoder, TransformerEncoderConfig, TransformerEncoderInput,
        },
        Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
};

use crate::domain::dims::{check_heads, check_sequence, SequenceDims, Shape4, ShapeError};

/// Anything that maps an input batch to a prediction in one call.
///
/// The plain and trajectory training loops only need this much.
pub trait SequencePredictor<B: Backend> {
    fn predict(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 4>, ShapeError>;
}

// ─── Sequence-to-sequence attention ───────────────────────────────────────────

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct Seq2SeqAttentionConfig {
    pub d_model: usize,
    pub n_heads: usize,
    #[config(default = 6)]
    pub n_layers: usize,
    #[config(default = 2048)]
    pub d_ff: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl Seq2SeqAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Seq2SeqAttention<B>, ShapeError> {
        check_heads(self.d_model, self.n_heads)?;
        let encoder = TransformerEncoderConfig::new(self.d_model, self.d_ff, self.n_heads, self.n_layers)
            .with_dropout(self.dropout)
            .init(device);
        let decoder = TransformerDecoderConfig::new(self.d_model, self.d_ff, self.n_heads, self.n_layers)
            .with_dropout(self.dropout)
            .init(device);
        Ok(Seq2SeqAttention { encoder, decoder })
    }
}

/// Encoder/decoder transformer: the source sequence is encoded into a
/// memory, the target sequence is decoded against it.
#[derive(Module, Debug)]
pub struct Seq2SeqAttention<B: Backend> {
    pub encoder: TransformerEncoder<B>,
    pub decoder: TransformerDecoder<B>,
}

impl<B: Backend> Seq2SeqAttention<B> {
    /// source: [batch, src_len, d_model], target: [batch, tgt_len, d_model]
    /// → [batch, tgt_len, d_model]
    pub fn forward(&self, source: Tensor<B, 3>, target: Tensor<B, 3>) -> Tensor<B, 3> {
        let memory = self.encoder.forward(TransformerEncoderInput::new(source));
        self.decoder.forward(TransformerDecoderInput::new(target, memory))
    }
}

fn same_padding_conv<B: Backend>(in_channels: usize, out_channels: usize, device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new([in_channels, out_channels], [3, 3])
        .with_stride([1, 1])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .init(device)
}

// ─── Trajectory predictor ─────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct TrajectoryPredictorConfig {
    pub dims: SequenceDims,
    #[config(default = 4)]
    pub n_heads: usize,
    #[config(default = 6)]
    pub n_layers: usize,
    #[config(default = 2048)]
    pub d_ff: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl TrajectoryPredictorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<TrajectoryPredictor<B>, ShapeError> {
        let d = self.dims;
        d.validate()?;
        let attention = Seq2SeqAttentionConfig::new(d.feature_dim, self.n_heads)
            .with_n_layers(self.n_layers)
            .with_d_ff(self.d_ff)
            .with_dropout(self.dropout)
            .init(device)?;
        Ok(TrajectoryPredictor {
            encoder:     same_padding_conv(d.in_channels, d.feature_dim, device),
            pool:        AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            attention,
            projection:  LinearConfig::new(d.feature_dim, d.plane_len()).init(device),
            frames:      d.frames,
            shots:       d.shots,
            samples:     d.samples,
            in_channels: d.in_channels,
            feature_dim: d.feature_dim,
        })
    }
}

/// Pools the encoded input into one feature vector, then grows a sequence
/// of `frames` vectors by repeatedly attending from the sequence so far to
/// that seed vector. The sequence is projected to full frames at the end.
#[derive(Module, Debug)]
pub struct TrajectoryPredictor<B: Backend> {
    pub encoder:     Conv2d<B>,
    pub pool:        AdaptiveAvgPool2d,
    pub attention:   Seq2SeqAttention<B>,
    pub projection:  Linear<B>,
    pub frames:      usize,
    pub shots:       usize,
    pub samples:     usize,
    pub in_channels: usize,
    pub feature_dim: usize,
}

/// Output of `TrajectoryPredictor::forward_traced`.
pub struct TrajectoryTrace<B: Backend> {
    /// [batch, frames, shots, samples]
    pub frames: Tensor<B, 4>,
    /// [batch, frames, feature_dim]. Slot t < frames-1 holds the pooled
    /// seed, not the attention output of step t; the last slot stays zero.
    /// Nothing downstream reads these slots.
    pub slots: Tensor<B, 3>,
}

impl<B: Backend> TrajectoryPredictor<B> {
    pub fn input_shape(&self, batch: usize) -> Shape4 {
        Shape4::new(batch, self.in_channels, self.shots, self.samples)
    }

    pub fn output_shape(&self, batch: usize) -> Shape4 {
        Shape4::new(batch, self.frames, self.shots, self.samples)
    }

    /// x: [batch, in_channels, shots, samples] → [batch, frames, shots, samples]
    pub fn forward(&self, x: Tensor<B, 4>) -> Result<Tensor<B, 4>, ShapeError> {
        Ok(self.forward_traced(x)?.frames)
    }

    /// Same as `forward`, also returning the per-frame slot buffer.
    pub fn forward_traced(&self, x: Tensor<B, 4>) -> Result<TrajectoryTrace<B>, ShapeError> {
        let seed = self.seed(x)?;
        self.unroll(seed)
    }

    /// [batch, in_channels, shots, samples] → [batch, 1, feature_dim]
    fn seed(&self, x: Tensor<B, 4>) -> Result<Tensor<B, 3>, ShapeError> {
        let [batch, _, _, _] = x.dims();
        self.input_shape(batch).check("trajectory input", x.dims())?;

        let encoded = self.encoder.forward(x);     // [batch, feature_dim, shots, samples]
        let pooled  = self.pool.forward(encoded);  // [batch, feature_dim, 1, 1]
        Ok(pooled.reshape([batch, 1, self.feature_dim]))
    }

    fn unroll(&self, seed: Tensor<B, 3>) -> Result<TrajectoryTrace<B>, ShapeError> {
        let batch = seed.dims()[0];

        let mut slots    = Tensor::<B, 3>::zeros([batch, self.frames, self.feature_dim], &seed.device());
        let mut sequence = seed.clone();
        for t in 0..self.frames - 1 {
            // Target length is 1, so each step yields exactly one new vector
            let next = self.attention.forward(sequence.clone(), seed.clone());
            slots    = slots.slice_assign([0..batch, t..t + 1, 0..self.feature_dim], seed.clone());
            sequence = Tensor::cat(vec![sequence, next], 1);
        }

        let projected = self.projection.forward(sequence); // [batch, frames, shots*samples]
        let frames = projected.reshape([batch, self.frames, self.shots, self.samples]);
        self.output_shape(batch).check("trajectory output", frames.dims())?;
        Ok(TrajectoryTrace { frames, slots })
    }
}

impl<B: Backend> SequencePredictor<B> for TrajectoryPredictor<B> {
    fn predict(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 4>, ShapeError> {
        self.forward(input)
    }
}

// ─── Shot predictor ───────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct ShotPredictorConfig {
    pub dims: SequenceDims,
    #[config(default = 4)]
    pub n_heads: usize,
    #[config(default = 6)]
    pub n_layers: usize,
    #[config(default = 2048)]
    pub d_ff: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl ShotPredictorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ShotPredictor<B>, ShapeError> {
        let d = self.dims;
        d.validate()?;
        let attention = Seq2SeqAttentionConfig::new(d.shot_d_model(), self.n_heads)
            .with_n_layers(self.n_layers)
            .with_d_ff(self.d_ff)
            .with_dropout(self.dropout)
            .init(device)?;
        Ok(ShotPredictor {
            encoder:      same_padding_conv(d.in_channels, d.out_channels, device),
            attention,
            shots:        d.shots,
            samples:      d.samples,
            in_channels:  d.in_channels,
            out_channels: d.out_channels,
        })
    }
}

/// Encodes each shot into one token and runs a single attention pass
/// across the shots of a frame.
#[derive(Module, Debug)]
pub struct ShotPredictor<B: Backend> {
    pub encoder:      Conv2d<B>,
    pub attention:    Seq2SeqAttention<B>,
    pub shots:        usize,
    pub samples:      usize,
    pub in_channels:  usize,
    pub out_channels: usize,
}

/// One shot-predictor call.
pub struct ShotStep<B: Backend> {
    /// [batch, out_channels, shots, samples]
    pub output: Tensor<B, 4>,
    /// The attention reference used for this call: [batch, len, d_model].
    /// Feed it back as `memory` to keep accumulating.
    pub memory: Tensor<B, 3>,
}

impl<B: Backend> ShotPredictor<B> {
    pub fn input_shape(&self, batch: usize) -> Shape4 {
        Shape4::new(batch, self.in_channels, self.shots, self.samples)
    }

    pub fn output_shape(&self, batch: usize) -> Shape4 {
        Shape4::new(batch, self.out_channels, self.shots, self.samples)
    }

    pub fn d_model(&self) -> usize {
        self.samples * self.out_channels
    }

    /// [batch, in_channels, shots, samples] → [batch, shots, samples*out_channels]
    pub fn encode(&self, x: Tensor<B, 4>) -> Result<Tensor<B, 3>, ShapeError> {
        let [batch, _, _, _] = x.dims();
        self.input_shape(batch).check("shot input", x.dims())?;

        let encoded = self.encoder.forward(x); // [batch, out_channels, shots, samples]
        Ok(encoded
            .permute([0, 2, 3, 1])
            .reshape([batch, self.shots, self.d_model()]))
    }

    /// Last-frame mode: the encoded sequence attends to itself.
    pub fn forward(&self, x: Tensor<B, 4>) -> Result<Tensor<B, 4>, ShapeError> {
        Ok(self.step(x, None)?.output)
    }

    /// With `memory = None` this is last-frame mode. With a previous
    /// memory the reference becomes `[memory; encoded]` along the
    /// sequence axis, so it grows by `shots` tokens per call.
    pub fn step(&self, x: Tensor<B, 4>, memory: Option<Tensor<B, 3>>) -> Result<ShotStep<B>, ShapeError> {
        let sequence = self.encode(x)?;
        let batch = sequence.dims()[0];

        let reference = match memory {
            None => sequence.clone(),
            Some(previous) => {
                check_sequence("shot memory", batch, self.d_model(), previous.dims())?;
                Tensor::cat(vec![previous, sequence.clone()], 1)
            }
        };

        let attended = self.attention.forward(reference.clone(), sequence); // [batch, shots, d_model]
        let output = attended
            .reshape([batch, self.shots, self.samples, self.out_channels])
            .permute([0, 3, 1, 2]);
        self.output_shape(batch).check("shot output", output.dims())?;

        Ok(ShotStep { output, memory: reference })
    }
}

impl<B: Backend> SequencePredictor<B> for ShotPredictor<B> {
    fn predict(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 4>, ShapeError> {
        self.forward(input)
    }
}
