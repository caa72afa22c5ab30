use tch::nn::{self, Module, OptimizerConfig, RNNConfig, RNN};
use tch::{Device, Reduction, Tensor};
use thiserror::Error;

use crate::utils::rounding::{ceil_to_hundredths, round_to_hundredths};

/// 学習ウィンドウ長。これ以下の系列は予測対象外
pub const WINDOW_SIZE: usize = 60;

const HIDDEN_SIZE: i64 = 50;
const NUM_LAYERS: i64 = 2;
const EPOCHS: usize = 10;
const BATCH_SIZE: usize = 32;
const LEARNING_RATE: f64 = 1e-3;

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("torch error: {0}")]
    Torch(#[from] tch::TchError),
}

/// 終値系列から翌営業日の終値を 1 点予測する。
/// 系列が短い場合は None（モデルは構築しない）
pub trait Forecaster: Send + Sync {
    fn predict_next(&self, closes: &[f64]) -> Result<Option<f64>, ForecastError>;
}

/// リクエスト毎に学習し直す LSTM 予測器
pub struct LstmForecaster {
    pub window: usize,
}

impl Default for LstmForecaster {
    fn default() -> Self {
        Self {
            window: WINDOW_SIZE,
        }
    }
}

impl Forecaster for LstmForecaster {
    fn predict_next(&self, closes: &[f64]) -> Result<Option<f64>, ForecastError> {
        if closes.len() <= self.window {
            return Ok(None);
        }
        let Some(scaler) = MinMaxScaler::fit(closes) else {
            return Ok(None);
        };
        let scaled: Vec<f64> = closes.iter().map(|&c| scaler.scale(c)).collect();

        let (inputs, targets) = sliding_windows(&scaled, self.window);
        let n_windows = targets.len() as i64;
        let xs = Tensor::from_slice(&inputs).view([n_windows, self.window as i64, 1]);
        let ys = Tensor::from_slice(&targets).view([n_windows, 1]);

        let vs = nn::VarStore::new(Device::Cpu);
        let lstm = nn::lstm(
            &vs.root(),
            1,
            HIDDEN_SIZE,
            RNNConfig {
                has_biases: true,
                num_layers: NUM_LAYERS,
                dropout: 0.,
                train: true,
                bidirectional: false,
                batch_first: true,
            },
        );
        let linear = nn::linear(&vs.root(), HIDDEN_SIZE, 1, Default::default());
        let mut opt = nn::Adam::default().build(&vs, LEARNING_RATE)?;

        let last_step = (self.window - 1) as i64;
        for _epoch in 0..EPOCHS {
            for batch_start in (0..n_windows).step_by(BATCH_SIZE) {
                let batch_len = (n_windows - batch_start).min(BATCH_SIZE as i64);
                let batch_xs = xs.narrow(0, batch_start, batch_len);
                let batch_ys = ys.narrow(0, batch_start, batch_len);
                let (hidden, _state) = lstm.seq(&batch_xs);
                let pred = linear.forward(&hidden.narrow(1, last_step, 1).squeeze_dim(1));
                let loss = pred.mse_loss(&batch_ys, Reduction::Mean);
                opt.backward_step(&loss);
            }
        }

        // 末尾ウィンドウから 1 点先を推論
        let tail: Vec<f32> = scaled[scaled.len() - self.window..]
            .iter()
            .map(|&v| v as f32)
            .collect();
        let tail = Tensor::from_slice(&tail).view([1, self.window as i64, 1]);
        let out = tch::no_grad(|| {
            let (hidden, _state) = lstm.seq(&tail);
            linear.forward(&hidden.narrow(1, last_step, 1).squeeze_dim(1))
        });
        let predicted = scaler.invert(out.double_value(&[0, 0]));
        Ok(Some(ceil_to_hundredths(predicted)))
    }
}

/// 系列を (ウィンドウ → 直後の値) の学習ペアへ展開する
fn sliding_windows(series: &[f64], window: usize) -> (Vec<f32>, Vec<f32>) {
    let n_windows = series.len() - window;
    let mut inputs = Vec::with_capacity(n_windows * window);
    let mut targets = Vec::with_capacity(n_windows);
    for i in 0..n_windows {
        inputs.extend(series[i..i + window].iter().map(|&v| v as f32));
        targets.push(series[i + window] as f32);
    }
    (inputs, targets)
}

/// [0, 1] への min-max スケーラ
struct MinMaxScaler {
    min: f64,
    range: f64,
}

impl MinMaxScaler {
    fn fit(values: &[f64]) -> Option<Self> {
        let first = values.first()?;
        let (min, max) = values
            .iter()
            .fold((*first, *first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Some(Self {
            min,
            range: max - min,
        })
    }

    fn scale(&self, v: f64) -> f64 {
        if self.range == 0.0 {
            return 0.0;
        }
        (v - self.min) / self.range
    }

    fn invert(&self, v: f64) -> f64 {
        self.min + v * self.range
    }
}

/// 前日比: 最新終値 - 前日終値。観測が 1 点以下なら 0
pub fn change_today(closes: &[f64]) -> f64 {
    if closes.len() < 2 {
        return 0.0;
    }
    round_to_hundredths(closes[closes.len() - 1] - closes[closes.len() - 2])
}

/// 前日比の表示文字列。正のときだけ + を付ける
pub fn format_change(change: f64) -> String {
    if change > 0.0 {
        format!("+{:.2}円", change)
    } else {
        format!("{:.2}円", change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_series_yields_no_forecast() {
        let forecaster = LstmForecaster::default();
        assert!(forecaster.predict_next(&[]).unwrap().is_none());
        assert!(forecaster.predict_next(&[152.0]).unwrap().is_none());
        // 長さ W ちょうどでも学習ペアが作れない
        let series = vec![100.0; WINDOW_SIZE];
        assert!(forecaster.predict_next(&series).unwrap().is_none());
    }

    #[test]
    fn sliding_windows_pair_each_window_with_next_value() {
        let (inputs, targets) = sliding_windows(&[1.0, 2.0, 3.0, 4.0, 5.0], 2);
        assert_eq!(inputs, vec![1.0, 2.0, 2.0, 3.0, 3.0, 4.0]);
        assert_eq!(targets, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn scaler_round_trips() {
        let scaler = MinMaxScaler::fit(&[100.0, 150.0, 200.0]).unwrap();
        assert_eq!(scaler.scale(100.0), 0.0);
        assert_eq!(scaler.scale(200.0), 1.0);
        assert_eq!(scaler.invert(scaler.scale(150.0)), 150.0);
    }

    #[test]
    fn degenerate_scaler_is_safe() {
        let scaler = MinMaxScaler::fit(&[42.0, 42.0]).unwrap();
        assert_eq!(scaler.scale(42.0), 0.0);
        assert_eq!(scaler.invert(0.0), 42.0);
        assert!(MinMaxScaler::fit(&[]).is_none());
    }

    #[test]
    fn change_today_needs_two_observations() {
        assert_eq!(change_today(&[]), 0.0);
        assert_eq!(change_today(&[152.0]), 0.0);
        assert_eq!(change_today(&[150.0, 152.0]), 2.0);
        assert_eq!(change_today(&[152.0, 150.5]), -1.5);
    }

    #[test]
    fn change_display_prefixes_positive_only() {
        assert_eq!(format_change(2.0), "+2.00円");
        assert_eq!(format_change(-1.5), "-1.50円");
        assert_eq!(format_change(0.0), "0.00円");
    }
}
