//! Enumerations shared across the gateway.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aspect ratios accepted by the Imagen models.
///
/// 枚举顺序即平局时的优先顺序（先声明者胜出）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    SixteenByNine,
    #[serde(rename = "9:16")]
    NineBySixteen,
    #[serde(rename = "4:3")]
    FourByThree,
    #[serde(rename = "3:4")]
    ThreeByFour,
}

impl AspectRatio {
    /// All supported ratios, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Square,
        Self::SixteenByNine,
        Self::NineBySixteen,
        Self::FourByThree,
        Self::ThreeByFour,
    ];

    /// 比例的字符串形式（上游参数值）。
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::SixteenByNine => "16:9",
            Self::NineBySixteen => "9:16",
            Self::FourByThree => "4:3",
            Self::ThreeByFour => "3:4",
        }
    }

    /// 比例的数值（宽 / 高）。
    #[must_use]
    pub const fn value(self) -> f64 {
        match self {
            Self::Square => 1.0,
            Self::SixteenByNine => 16.0 / 9.0,
            Self::NineBySixteen => 9.0 / 16.0,
            Self::FourByThree => 4.0 / 3.0,
            Self::ThreeByFour => 3.0 / 4.0,
        }
    }

    /// 解析 `"w:h"` 形式的比例字符串，仅接受受支持的成员。
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.as_str() == token)
    }

    /// Map explicit pixel dimensions onto a supported ratio.
    ///
    /// Reduces by gcd first; an exact member match wins. Otherwise the
    /// member whose numeric value is closest to `width / height` is chosen,
    /// first declared wins on an exact tie.
    #[must_use]
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        let divisor = gcd(width, height);
        let simplified = format!("{}:{}", width / divisor, height / divisor);
        if let Some(ratio) = Self::parse(&simplified) {
            return ratio;
        }

        let requested = f64::from(width) / f64::from(height);
        let mut closest = Self::Square;
        let mut distance = f64::INFINITY;
        for ratio in Self::ALL {
            let delta = (requested - ratio.value()).abs();
            if delta < distance {
                closest = ratio;
                distance = delta;
            }
        }
        closest
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let rem = a % b;
        a = b;
        b = rem;
    }
    a
}
