use tch::Tensor;
use tch::nn::VarStore;

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPS: f64 = 1e-8;

struct Slot {
    name: String,
    var: Tensor,
    m: Tensor,
    v: Tensor,
}

/// Adam over the trainable variables of a `VarStore`, with the moment
/// estimates held as named tensors so checkpoints can carry the full
/// optimizer state. Variables are visited in sorted-name order, keeping
/// both updates and checkpoint layout deterministic.
pub struct Adam {
    lr: f64,
    step: i64,
    slots: Vec<Slot>,
}

impl Adam {
    pub fn new(vs: &VarStore, lr: f64) -> Adam {
        let mut named: Vec<(String, Tensor)> = vs.variables().into_iter().collect();
        named.sort_by(|a, b| a.0.cmp(&b.0));

        let slots = named
            .into_iter()
            .filter(|(_, var)| var.requires_grad())
            .map(|(name, var)| {
                let m = var.zeros_like();
                let v = var.zeros_like();
                Slot { name, var, m, v }
            })
            .collect();

        Adam { lr, step: 0, slots }
    }

    pub fn zero_grad(&mut self) {
        for slot in &mut self.slots {
            slot.var.zero_grad();
        }
    }

    /// One Adam update from the gradients of the last backward pass.
    pub fn step(&mut self) {
        self.step += 1;

        let correction1 = 1.0 - BETA1.powi(self.step as i32);
        let correction2 = 1.0 - BETA2.powi(self.step as i32);
        let lr = self.lr;

        tch::no_grad(|| {
            for slot in &mut self.slots {
                let grad = slot.var.grad();
                if !grad.defined() {
                    continue;
                }

                let m_next = &slot.m * BETA1 + &grad * (1.0 - BETA1);
                let v_next = &slot.v * BETA2 + grad.square() * (1.0 - BETA2);
                slot.m.copy_(&m_next);
                slot.v.copy_(&v_next);

                let m_hat = &slot.m / correction1;
                let v_hat = &slot.v / correction2;
                let update = m_hat * lr / (v_hat.sqrt() + EPS);

                let _ = slot.var.g_sub_(&update);
            }
        });
    }

    /// Optimizer state as named tensors, for checkpointing.
    pub fn state_tensors(&self) -> Vec<(String, Tensor)> {
        let mut tensors = Vec::with_capacity(2 * self.slots.len() + 1);

        for slot in &self.slots {
            tensors.push((format!("opt/m/{}", slot.name), slot.m.shallow_clone()));
            tensors.push((format!("opt/v/{}", slot.name), slot.v.shallow_clone()));
        }
        tensors.push(("opt/step".to_string(), Tensor::from(self.step)));

        tensors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::nn;
    use tch::{Device, Kind};

    #[test]
    fn step_moves_parameters_against_the_gradient() {
        let vs = nn::VarStore::new(Device::Cpu);
        let weight = vs.root().var("w", &[1], nn::Init::Const(2.0));
        let mut opt = Adam::new(&vs, 0.1);

        // minimize w^2, gradient at w=2 is positive
        for _ in 0..5 {
            opt.zero_grad();
            let loss = weight.square().sum(Kind::Float);
            loss.backward();
            opt.step();
        }

        let w = weight.double_value(&[0]);
        assert!(w < 2.0);
    }

    #[test]
    fn state_covers_every_trainable_variable() {
        let vs = nn::VarStore::new(Device::Cpu);
        let _a = vs.root().var("a", &[3], nn::Init::Const(0.0));
        let _b = vs.root().var("b", &[2, 2], nn::Init::Const(0.0));
        let opt = Adam::new(&vs, 1e-3);

        let state = opt.state_tensors();
        let names: Vec<&str> = state.iter().map(|(n, _)| n.as_str()).collect();

        assert!(names.contains(&"opt/m/a"));
        assert!(names.contains(&"opt/v/a"));
        assert!(names.contains(&"opt/m/b"));
        assert!(names.contains(&"opt/v/b"));
        assert!(names.contains(&"opt/step"));
    }
}
