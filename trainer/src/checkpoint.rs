use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tch::nn::VarStore;
use tch::{Device, Tensor};

use crate::optim::Adam;

/// Writes the per-epoch checkpoint: all model variables (batch-norm running
/// statistics included), the optimizer state and metadata tensors for the
/// epoch index and average loss. The file is written to a temp path and
/// renamed, so an interrupted run never leaves a truncated checkpoint as
/// the newest artifact.
pub fn write_checkpoint(
    dir: &Path,
    epoch: usize,
    vs: &VarStore,
    opt: &Adam,
    avg_loss: f64,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create checkpoint dir {}", dir.display()))?;

    let mut tensors: Vec<(String, Tensor)> = vs
        .variables()
        .into_iter()
        .map(|(name, var)| (format!("model/{name}"), var))
        .collect();
    tensors.sort_by(|a, b| a.0.cmp(&b.0));

    tensors.extend(opt.state_tensors());
    tensors.push(("meta/epoch".to_string(), Tensor::from(epoch as i64)));
    tensors.push(("meta/loss".to_string(), Tensor::from(avg_loss)));

    // safetensors wants plain CPU tensors
    let tensors: Vec<(String, Tensor)> = tensors
        .into_iter()
        .map(|(name, t)| (name, t.detach().to(Device::Cpu)))
        .collect();

    let path = dir.join(format!("model_epoch_{epoch}.safetensors"));
    let tmp = dir.join(format!(".model_epoch_{epoch}.safetensors.tmp"));

    Tensor::write_safetensors(&tensors, &tmp)
        .with_context(|| format!("failed to write checkpoint {}", path.display()))?;
    fs::rename(&tmp, &path)
        .with_context(|| format!("failed to finalize checkpoint {}", path.display()))?;

    Ok(path)
}

/// Persists the final weights to their well-known location, atomically
/// overwriting any prior version.
pub fn write_final(vs: &VarStore, path: &Path) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir {}", dir.display()))?;

    // temp name keeps the .safetensors extension so the format matches
    let tmp = dir.join(".final.tmp.safetensors");
    vs.save(&tmp)
        .with_context(|| format!("failed to save final weights to {}", path.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to finalize final weights {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::nn;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("eval-ckpt-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn checkpoint_holds_model_optimizer_and_metadata() {
        let dir = temp_dir("full");

        let vs = nn::VarStore::new(Device::Cpu);
        let _w = vs.root().sub("fc").var("weight", &[2, 2], nn::Init::Const(1.0));
        let opt = Adam::new(&vs, 1e-3);

        let path = write_checkpoint(&dir, 3, &vs, &opt, 0.25).unwrap();
        assert!(path.ends_with("model_epoch_3.safetensors"));

        let tensors = Tensor::read_safetensors(&path).unwrap();
        let find = |name: &str| {
            tensors
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, t)| t)
                .unwrap()
        };

        assert_eq!(find("meta/epoch").int64_value(&[]), 3);
        assert!((find("meta/loss").double_value(&[]) - 0.25).abs() < 1e-12);
        assert_eq!(find("model/fc.weight").size(), vec![2, 2]);
        assert_eq!(find("opt/m/fc.weight").size(), vec![2, 2]);
        assert_eq!(find("opt/step").int64_value(&[]), 0);

        // no temp file left behind
        assert!(!dir.join(".model_epoch_3.safetensors.tmp").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn final_weights_overwrite_previous_version() {
        let dir = temp_dir("final");
        let path = dir.join("eval.safetensors");

        let vs = nn::VarStore::new(Device::Cpu);
        let _w = vs.root().var("w", &[1], nn::Init::Const(1.0));

        write_final(&vs, &path).unwrap();
        let first = fs::metadata(&path).unwrap().len();

        write_final(&vs, &path).unwrap();
        let second = fs::metadata(&path).unwrap().len();

        assert_eq!(first, second);
        assert!(!dir.join(".final.tmp.safetensors").exists());

        let _ = fs::remove_dir_all(&dir);
    }
}
