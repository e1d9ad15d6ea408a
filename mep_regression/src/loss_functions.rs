use std::sync::Arc;

use num_traits::Float;

/// Scalar error over an expected/predicted pair of sequences. Lower is
/// better; the engine is agnostic to which metric is plugged in.
pub trait LossFn<T: Float>: Send + Sync {
    fn loss(&self, expected: &[T], predicted: &[T]) -> T;
}

pub type LossObject<T> = Arc<dyn LossFn<T>>;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LossKind {
    Mse,
    Mae,
    Rmse,
    Huber { delta: f64 },
}

impl LossKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mse" => Some(Self::Mse),
            "mae" => Some(Self::Mae),
            "rmse" => Some(Self::Rmse),
            "huber" => Some(Self::Huber { delta: 1.0 }),
            _ => None,
        }
    }
}

pub fn make_loss<T: Float + Send + Sync + 'static>(kind: LossKind) -> LossObject<T> {
    match kind {
        LossKind::Mse => mse::<T>(),
        LossKind::Mae => mae::<T>(),
        LossKind::Rmse => rmse::<T>(),
        LossKind::Huber { delta } => huber::<T>(delta),
    }
}

pub trait PointwiseLoss<T: Float> {
    fn point_loss(&self, expected: T, predicted: T) -> T;
}

/// Mean of a pointwise loss over the whole sequence.
#[derive(Clone, Debug)]
pub struct MeanLoss<L>(pub L);

impl<T: Float, L: PointwiseLoss<T> + Send + Sync> LossFn<T> for MeanLoss<L> {
    fn loss(&self, expected: &[T], predicted: &[T]) -> T {
        assert_eq!(expected.len(), predicted.len());
        if expected.is_empty() {
            return T::zero();
        }
        let n = T::from(expected.len()).unwrap();
        expected
            .iter()
            .zip(predicted)
            .map(|(&e, &p)| self.0.point_loss(e, p))
            .fold(T::zero(), |acc, v| acc + v)
            / n
    }
}

#[derive(Clone, Debug, Default)]
pub struct SquaredLoss;

impl<T: Float> PointwiseLoss<T> for SquaredLoss {
    fn point_loss(&self, expected: T, predicted: T) -> T {
        let r = predicted - expected;
        r * r
    }
}

#[derive(Clone, Debug, Default)]
pub struct AbsLoss;

impl<T: Float> PointwiseLoss<T> for AbsLoss {
    fn point_loss(&self, expected: T, predicted: T) -> T {
        (predicted - expected).abs()
    }
}

#[derive(Clone, Debug)]
pub struct HuberLoss<T: Float> {
    pub delta: T,
}

impl<T: Float> PointwiseLoss<T> for HuberLoss<T> {
    fn point_loss(&self, expected: T, predicted: T) -> T {
        let r = predicted - expected;
        let ar = r.abs();
        let half = T::from(0.5).unwrap();
        if ar <= self.delta {
            half * r * r
        } else {
            self.delta * (ar - half * self.delta)
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Rmse;

impl<T: Float> LossFn<T> for Rmse {
    fn loss(&self, expected: &[T], predicted: &[T]) -> T {
        mse::<T>().loss(expected, predicted).sqrt()
    }
}

pub fn mse<T: Float>() -> LossObject<T> {
    Arc::new(MeanLoss(SquaredLoss))
}

pub fn mae<T: Float>() -> LossObject<T> {
    Arc::new(MeanLoss(AbsLoss))
}

pub fn rmse<T: Float>() -> LossObject<T> {
    Arc::new(Rmse)
}

pub fn huber<T: Float + Send + Sync + 'static>(delta: f64) -> LossObject<T> {
    Arc::new(MeanLoss(HuberLoss {
        delta: T::from(delta).unwrap_or_else(T::one),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mae_is_mean_absolute_error() {
        let m = mae::<f64>();
        assert_eq!(m.loss(&[1.0, 2.0, 3.0], &[1.0, 4.0, 1.0]), (0.0 + 2.0 + 2.0) / 3.0);
        assert_eq!(m.loss(&[], &[]), 0.0);
    }

    #[test]
    fn mse_squares_residuals() {
        let m = mse::<f64>();
        assert_eq!(m.loss(&[0.0, 0.0], &[3.0, -1.0]), (9.0 + 1.0) / 2.0);
    }

    #[test]
    fn rmse_is_root_of_mse() {
        let m = rmse::<f64>();
        assert_eq!(m.loss(&[0.0, 0.0], &[3.0, 3.0]), 3.0);
    }

    #[test]
    fn huber_is_quadratic_near_zero_and_linear_far_out() {
        let m = huber::<f64>(1.0);
        assert_eq!(m.loss(&[0.0], &[0.5]), 0.125);
        assert_eq!(m.loss(&[0.0], &[4.0]), 3.5);
    }

    #[test]
    fn kind_parsing() {
        assert_eq!(LossKind::parse("MAE"), Some(LossKind::Mae));
        assert_eq!(LossKind::parse(" rmse "), Some(LossKind::Rmse));
        assert_eq!(LossKind::parse("huber"), Some(LossKind::Huber { delta: 1.0 }));
        assert_eq!(LossKind::parse("nope"), None);
    }
}
