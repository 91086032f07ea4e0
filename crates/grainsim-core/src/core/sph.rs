use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// SPH smoothing kernels known to the stability diagnostics.
///
/// Only the support radius matters here: a neighbor interacts when it lies
/// within `kernel_cut() * sl` of the particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SphKernel {
    #[default]
    CubicSpline,
    Wendland,
    Spiky,
}

impl SphKernel {
    pub fn kernel_cut(self) -> f64 {
        match self {
            SphKernel::CubicSpline | SphKernel::Wendland => 2.0,
            SphKernel::Spiky => 1.0,
        }
    }
}

impl fmt::Display for SphKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SphKernel::CubicSpline => "cubic-spline",
            SphKernel::Wendland => "wendland",
            SphKernel::Spiky => "spiky",
        };
        f.write_str(name)
    }
}

impl FromStr for SphKernel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cubic-spline" | "cubicspline" => Ok(SphKernel::CubicSpline),
            "wendland" => Ok(SphKernel::Wendland),
            "spiky" => Ok(SphKernel::Spiky),
            other => Err(format!("unknown SPH kernel '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_cut_factors() {
        assert_eq!(SphKernel::CubicSpline.kernel_cut(), 2.0);
        assert_eq!(SphKernel::Wendland.kernel_cut(), 2.0);
        assert_eq!(SphKernel::Spiky.kernel_cut(), 1.0);
    }

    #[test]
    fn display_and_from_str_agree() {
        for kernel in [SphKernel::CubicSpline, SphKernel::Wendland, SphKernel::Spiky] {
            assert_eq!(kernel.to_string().parse::<SphKernel>().unwrap(), kernel);
        }
        assert!("gaussian".parse::<SphKernel>().is_err());
    }

    #[test]
    fn deserializes_from_kebab_case() {
        #[derive(Deserialize)]
        struct Holder {
            kernel: SphKernel,
        }
        let h: Holder = toml::from_str("kernel = \"wendland\"").unwrap();
        assert_eq!(h.kernel, SphKernel::Wendland);
    }
}
