//! Supported charger variants and their frame layouts.

use crate::device::classifier::ModeScheme;
use crate::device::layout::{CellBlock, ChannelLayout, OutletLayout, ProductField, TemperatureField};
use crate::error::UltramatError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Charger models understood by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceVariant {
    Ultramat16S,
    Ultramat18,
    UltraDuoPlus45,
    UltraDuoPlus50,
    UltraDuoPlus60,
    UltraDuoPlus80,
    UltraQuick70,
    UltramatTrio14,
    UltraTrioPlus14,
    UltraTrioPlus16S,
}

const fn duo_outlet(base: usize, cells: usize) -> OutletLayout {
    OutletLayout {
        supply: base,
        mode: base + 4,
        sub_type: Some(base + 6),
        cycle: Some(base + 8),
        memory: None,
        voltage: base + 10,
        current: base + 14,
        charge: base + 18,
        temperature: Some(TemperatureField {
            value: base + 22,
            sign: base + 26,
            unit: Some(base + 28),
        }),
        cells: CellBlock {
            start: base + 30,
            count: cells,
        },
    }
}

const fn trio_outlet(supply: usize, mode: usize, cycle: Option<usize>, cells: usize) -> OutletLayout {
    let values = match cycle {
        Some(c) => c + 2,
        None => mode + 2,
    };
    OutletLayout {
        supply,
        mode,
        sub_type: None,
        cycle,
        memory: None,
        voltage: values,
        current: values + 4,
        charge: values + 8,
        temperature: None,
        cells: CellBlock {
            start: values + 12,
            count: cells,
        },
    }
}

const fn product(code: u8) -> Option<ProductField> {
    Some(ProductField {
        offset: 1,
        code,
        firmware: Some(3),
    })
}

static ULTRAMAT_16S_OUTLETS: [OutletLayout; 1] = [duo_outlet(11, 6)];
static ULTRAMAT_18_OUTLETS: [OutletLayout; 1] = [duo_outlet(11, 7)];

static ULTRA_DUO_PLUS_45_OUTLETS: [OutletLayout; 2] = [
    OutletLayout {
        memory: Some(5),
        ..duo_outlet(11, 14)
    },
    OutletLayout {
        cycle: None,
        voltage: 105,
        current: 109,
        charge: 113,
        temperature: Some(TemperatureField {
            value: 117,
            sign: 121,
            unit: Some(123),
        }),
        cells: CellBlock {
            start: 125,
            count: 5,
        },
        ..duo_outlet(97, 5)
    },
];

static ULTRA_DUO_PLUS_50_OUTLETS: [OutletLayout; 2] = [duo_outlet(5, 7), duo_outlet(5, 7).shifted(58)];
static ULTRA_DUO_PLUS_60_OUTLETS: [OutletLayout; 2] = [duo_outlet(11, 7), duo_outlet(75, 7)];
static ULTRA_DUO_PLUS_80_OUTLETS: [OutletLayout; 2] = [duo_outlet(3, 7), duo_outlet(3, 7).shifted(58)];

static ULTRA_QUICK_70_OUTLETS: [OutletLayout; 1] = [OutletLayout {
    supply: 7,
    mode: 11,
    sub_type: Some(13),
    cycle: None,
    memory: None,
    voltage: 15,
    current: 19,
    charge: 23,
    temperature: None,
    cells: CellBlock { start: 27, count: 4 },
}];

static TRIO_14_OUTLETS: [OutletLayout; 3] = [
    trio_outlet(5, 9, Some(11), 6),
    trio_outlet(5, 49, None, 3),
    trio_outlet(5, 75, None, 3),
];

static TRIO_PLUS_16S_OUTLETS: [OutletLayout; 3] = [
    trio_outlet(5, 9, Some(11), 8),
    trio_outlet(5, 57, None, 3),
    trio_outlet(5, 83, None, 3),
];

static ULTRAMAT_16S: ChannelLayout = ChannelLayout {
    name: "Ultramat 16S",
    frame_len: 70,
    scheme: ModeScheme::Duo,
    outlets: &ULTRAMAT_16S_OUTLETS,
    linked: None,
    product: product(6),
};

static ULTRAMAT_18: ChannelLayout = ChannelLayout {
    name: "Ultramat 18",
    frame_len: 74,
    scheme: ModeScheme::Duo,
    outlets: &ULTRAMAT_18_OUTLETS,
    linked: None,
    product: product(3),
};

static ULTRA_DUO_PLUS_45: ChannelLayout = ChannelLayout {
    name: "Ultra Duo Plus 45",
    frame_len: 150,
    scheme: ModeScheme::Duo,
    outlets: &ULTRA_DUO_PLUS_45_OUTLETS,
    linked: None,
    product: product(4),
};

static ULTRA_DUO_PLUS_50: ChannelLayout = ChannelLayout {
    name: "Ultra Duo Plus 50",
    frame_len: 126,
    scheme: ModeScheme::Duo,
    outlets: &ULTRA_DUO_PLUS_50_OUTLETS,
    linked: Some((1, 2)),
    product: None,
};

static ULTRA_DUO_PLUS_60: ChannelLayout = ChannelLayout {
    name: "Ultra Duo Plus 60",
    frame_len: 138,
    scheme: ModeScheme::Duo,
    outlets: &ULTRA_DUO_PLUS_60_OUTLETS,
    linked: Some((1, 2)),
    product: product(5),
};

static ULTRA_DUO_PLUS_80: ChannelLayout = ChannelLayout {
    name: "Ultra Duo Plus 80",
    frame_len: 124,
    scheme: ModeScheme::Duo,
    outlets: &ULTRA_DUO_PLUS_80_OUTLETS,
    linked: Some((1, 2)),
    product: None,
};

static ULTRA_QUICK_70: ChannelLayout = ChannelLayout {
    name: "Ultra Quick 70",
    frame_len: 48,
    scheme: ModeScheme::Quick,
    outlets: &ULTRA_QUICK_70_OUTLETS,
    linked: None,
    product: None,
};

static ULTRAMAT_TRIO_14: ChannelLayout = ChannelLayout {
    name: "Ultramat Trio 14",
    frame_len: 106,
    scheme: ModeScheme::Trio,
    outlets: &TRIO_14_OUTLETS,
    linked: None,
    product: None,
};

static ULTRA_TRIO_PLUS_14: ChannelLayout = ChannelLayout {
    name: "Ultra Trio Plus 14",
    frame_len: 106,
    scheme: ModeScheme::Trio,
    outlets: &TRIO_14_OUTLETS,
    linked: None,
    product: None,
};

static ULTRA_TRIO_PLUS_16S: ChannelLayout = ChannelLayout {
    name: "Ultra Trio Plus 16S",
    frame_len: 114,
    scheme: ModeScheme::Trio,
    outlets: &TRIO_PLUS_16S_OUTLETS,
    linked: None,
    product: None,
};

static BY_NAME: Lazy<HashMap<String, DeviceVariant>> = Lazy::new(|| {
    DeviceVariant::ALL
        .iter()
        .flat_map(|&v| {
            [
                (normalize(v.layout().name), v),
                (normalize(&format!("{v:?}")), v),
            ]
        })
        .collect()
});

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl DeviceVariant {
    pub const ALL: [DeviceVariant; 10] = [
        DeviceVariant::Ultramat16S,
        DeviceVariant::Ultramat18,
        DeviceVariant::UltraDuoPlus45,
        DeviceVariant::UltraDuoPlus50,
        DeviceVariant::UltraDuoPlus60,
        DeviceVariant::UltraDuoPlus80,
        DeviceVariant::UltraQuick70,
        DeviceVariant::UltramatTrio14,
        DeviceVariant::UltraTrioPlus14,
        DeviceVariant::UltraTrioPlus16S,
    ];

    pub fn layout(self) -> &'static ChannelLayout {
        match self {
            DeviceVariant::Ultramat16S => &ULTRAMAT_16S,
            DeviceVariant::Ultramat18 => &ULTRAMAT_18,
            DeviceVariant::UltraDuoPlus45 => &ULTRA_DUO_PLUS_45,
            DeviceVariant::UltraDuoPlus50 => &ULTRA_DUO_PLUS_50,
            DeviceVariant::UltraDuoPlus60 => &ULTRA_DUO_PLUS_60,
            DeviceVariant::UltraDuoPlus80 => &ULTRA_DUO_PLUS_80,
            DeviceVariant::UltraQuick70 => &ULTRA_QUICK_70,
            DeviceVariant::UltramatTrio14 => &ULTRAMAT_TRIO_14,
            DeviceVariant::UltraTrioPlus14 => &ULTRA_TRIO_PLUS_14,
            DeviceVariant::UltraTrioPlus16S => &ULTRA_TRIO_PLUS_16S,
        }
    }

    pub fn name(self) -> &'static str {
        self.layout().name
    }

    /// Variant reporting `code` in the product field, if any.
    pub fn from_product_code(code: u8) -> Option<DeviceVariant> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.layout().product.map(|p| p.code) == Some(code))
    }
}

impl fmt::Display for DeviceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceVariant {
    type Err = UltramatError;

    /// Accepts display names and identifiers, ignoring case, spaces and
    /// punctuation (`"Ultra Duo Plus 60"`, `"ultra-duo-plus-60"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BY_NAME
            .get(&normalize(s))
            .copied()
            .ok_or_else(|| UltramatError::Config(format!("unknown device variant {s:?}")))
    }
}
