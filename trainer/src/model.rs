use eval_constants::{HEAD, HIDDEN_1, HIDDEN_2, HIDDEN_3, INPUT_SIZE};
use tch::Tensor;
use tch::nn::init::{FanInOut, NonLinearity, NormalOrUniform};
use tch::nn::{self, Init, LinearConfig};

const DROPOUT: f64 = 0.3;

/// Kaiming-normal weights (fan-in, relu gain), zero biases.
fn kaiming_linear() -> LinearConfig {
    LinearConfig {
        ws_init: Init::Kaiming {
            dist: NormalOrUniform::Normal,
            fan: FanInOut::FanIn,
            non_linearity: NonLinearity::ReLU,
        },
        bs_init: Some(Init::Const(0.0)),
        bias: true,
    }
}

/// Feed-forward position evaluator: 896 -> 2048 -> 1024 -> 512 -> 256 -> 1,
/// tanh-bounded to [-1, 1]. The layer widths and the bounded output are a
/// contract consumed by external search code, not a tuning knob.
#[derive(Debug)]
pub struct EvalNet {
    fc1: nn::Linear,
    bn1: nn::BatchNorm,
    fc2: nn::Linear,
    bn2: nn::BatchNorm,
    fc3: nn::Linear,
    bn3: nn::BatchNorm,
    fc4: nn::Linear,
    out: nn::Linear,
}

impl EvalNet {
    pub fn new(vs: &nn::Path) -> EvalNet {
        let cfg = kaiming_linear();

        EvalNet {
            fc1: nn::linear(vs / "fc1", INPUT_SIZE as i64, HIDDEN_1 as i64, cfg),
            bn1: nn::batch_norm1d(vs / "bn1", HIDDEN_1 as i64, Default::default()),
            fc2: nn::linear(vs / "fc2", HIDDEN_1 as i64, HIDDEN_2 as i64, cfg),
            bn2: nn::batch_norm1d(vs / "bn2", HIDDEN_2 as i64, Default::default()),
            fc3: nn::linear(vs / "fc3", HIDDEN_2 as i64, HIDDEN_3 as i64, cfg),
            bn3: nn::batch_norm1d(vs / "bn3", HIDDEN_3 as i64, Default::default()),
            fc4: nn::linear(vs / "fc4", HIDDEN_3 as i64, HEAD as i64, cfg),
            out: nn::linear(vs / "out", HEAD as i64, 1, cfg),
        }
    }

    /// Forward pass. `train` switches batch norm to batch statistics and
    /// enables dropout; inference passes `false`.
    pub fn forward(&self, xs: &Tensor, train: bool) -> Tensor {
        let xs = xs
            .apply(&self.fc1)
            .leaky_relu()
            .apply_t(&self.bn1, train)
            .dropout(DROPOUT, train);

        let xs = xs
            .apply(&self.fc2)
            .leaky_relu()
            .apply_t(&self.bn2, train)
            .dropout(DROPOUT, train);

        let xs = xs
            .apply(&self.fc3)
            .leaky_relu()
            .apply_t(&self.bn3, train)
            .dropout(DROPOUT, train);

        xs.apply(&self.fc4).leaky_relu().apply(&self.out).tanh()
    }
}
