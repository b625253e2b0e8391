use burn::tensor::{Tensor, backend::Backend, module::conv2d, ops::ConvOptions};

pub(crate) const SSIM_WINDOW_SIZE: usize = 11;

pub(crate) struct Ssim<B: Backend> {
    weights_1d_v: Tensor<B, 4>,
}

fn gaussian<B: Backend>(window_size: usize, sigma: f64, device: &B::Device) -> Tensor<B, 1> {
    let window_extent = (window_size / 2) as f64;
    let vals: Vec<f64> = (0..window_size)
        .map(|x| f64::exp(-(x as f64 - window_extent).powi(2) / (2.0 * sigma.powi(2))))
        .collect();
    let gauss = Tensor::from_floats(vals.as_slice(), device);
    gauss.clone() / gauss.sum()
}

impl<B: Backend> Ssim<B> {
    pub fn new(window_size: usize, channels: usize, device: &B::Device) -> Self {
        // Channels out, in, h, w.
        let weights_1d_v = gaussian(window_size, 1.5, device)
            .reshape([window_size, 1])
            .unsqueeze()
            .repeat_dim(0, channels);
        Self { weights_1d_v }
    }

    // Separable gaussian filter without padding, so the result shrinks by window_size - 1.
    fn gaussian_blur(&self, img: Tensor<B, 4>) -> Tensor<B, 4> {
        let [channels, _, window_size, _] = self.weights_1d_v.dims();

        let conv_options = ConvOptions::new([1, 1], [0, 0], [1, 1], channels);
        let kernel_v = self.weights_1d_v.clone();
        let kernel_h = self
            .weights_1d_v
            .clone()
            .reshape([channels, 1, 1, window_size]);

        let v_blur = conv2d(img, kernel_v, None, conv_options.clone());
        conv2d(v_blur, kernel_h, None, conv_options)
    }

    /// Per-pixel SSIM of two `[N, C, H, W]` images scaled to `[0, 1]`.
    pub fn ssim(&self, img1: Tensor<B, 4>, img2: Tensor<B, 4>) -> Tensor<B, 4> {
        let mu_x = self.gaussian_blur(img1.clone());
        let mu_y = self.gaussian_blur(img2.clone());
        let mu_xx = mu_x.clone() * mu_x.clone();
        let mu_yy = mu_y.clone() * mu_y.clone();
        let mu_xy = mu_x * mu_y;

        let sigma_xx = self.gaussian_blur(img1.clone() * img1.clone()) - mu_xx.clone();
        let sigma_yy = self.gaussian_blur(img2.clone() * img2.clone()) - mu_yy.clone();
        let sigma_xy = self.gaussian_blur(img1 * img2) - mu_xy.clone();

        let c1 = 0.01f64.powi(2);
        let c2 = 0.03f64.powi(2);

        let cs = (sigma_xy * 2.0 + c2) / (sigma_xx + sigma_yy + c2);
        (mu_xy * 2.0 + c1) / (mu_xx + mu_yy + c1) * cs
    }
}

#[cfg(test)]
mod tests {
    use super::{SSIM_WINDOW_SIZE, Ssim};
    use burn::{
        backend::NdArray,
        tensor::{Float, Tensor},
    };
    type Backend = NdArray<f64>;

    fn create_test_img(s: f64, o: f64) -> Tensor<Backend, 4, Float> {
        let img_shape = [1, 3, 30, 50];
        let pixels = img_shape.iter().product::<usize>();
        Tensor::<Backend, 1, Float>::from_floats(
            (0..pixels)
                .map(|i| ((i as f64 * s + o).sin() + 1.0) / 2.0)
                .collect::<Vec<f64>>()
                .as_slice(),
            &Default::default(),
        )
        .reshape(img_shape)
    }

    #[test]
    fn identical_images_score_one() {
        let img = create_test_img(0.12, 0.5);
        let ssim = Ssim::new(SSIM_WINDOW_SIZE, 3, &Default::default());
        let map = ssim.ssim(img.clone(), img);
        assert_eq!(map.dims(), [1, 3, 20, 40]);
        assert!((map.mean().into_scalar() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unrelated_images_score_low_and_symmetric() {
        let img1 = create_test_img(0.12, 0.5);
        let img2 = create_test_img(0.53, 2.0);
        let ssim = Ssim::new(SSIM_WINDOW_SIZE, 3, &Default::default());

        let ab = ssim.ssim(img1.clone(), img2.clone()).mean().into_scalar();
        let ba = ssim.ssim(img2, img1).mean().into_scalar();
        assert!(ab < 0.5);
        assert!((ab - ba).abs() < 1e-12);
    }
}
