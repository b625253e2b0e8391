use std::path::Path;

use burn::prelude::Backend;
use burn::tensor::Tensor;
use image::RgbImage;

use crate::error::{PipelineError, Result};

/// Saves each image of an `[N, 3, H, W]` batch of 8-bit values as `dir/{name}`.
pub async fn eval_save_to_disk<B: Backend>(
    output: Tensor<B, 4>,
    names: &[String],
    dir: &Path,
) -> Result<()> {
    let [_, _, h, w] = output.dims();
    let data = output
        .permute([0, 2, 3, 1])
        .into_data()
        .convert::<u8>()
        .into_vec::<u8>()?;

    for (name, pixels) in names.iter().zip(data.chunks_exact(h * w * 3)) {
        let img = RgbImage::from_raw(w as u32, h as u32, pixels.to_vec()).ok_or_else(|| {
            PipelineError::InvalidOutput {
                name: name.clone(),
                width: w,
                height: h,
            }
        })?;

        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        log::debug!("Saving derained image to {path:?}");
        tokio::task::spawn_blocking(move || img.save(&path)).await??;
    }
    Ok(())
}
