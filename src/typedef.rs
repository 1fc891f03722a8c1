//! This module contains the enumerated vocabularies used by the supported
//! formats. Only `MET_FLOAT` voxels are decoded, but the other MetaImage
//! element types are recognised so that error messages can name them.

use std::fmt;
use std::str::FromStr;

use crate::error::FlowError;

/// MetaImage voxel element type (`ElementType` header field).
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ElementType {
    /// signed char.
    MetChar,
    /// unsigned char.
    MetUChar,
    /// signed short.
    MetShort,
    /// unsigned short.
    MetUShort,
    /// signed int.
    MetInt,
    /// unsigned int.
    MetUInt,
    /// 32 bit float.
    MetFloat,
    /// 64 bit float = double.
    MetDouble,
}

impl ElementType {
    /// Retrieve the size of an element of this data type, in bytes.
    pub fn size_of(self) -> usize {
        use ElementType::*;
        match self {
            MetChar | MetUChar => 1,
            MetShort | MetUShort => 2,
            MetInt | MetUInt | MetFloat => 4,
            MetDouble => 8,
        }
    }

    /// The name of this type as it appears in a header.
    pub fn as_str(self) -> &'static str {
        use ElementType::*;
        match self {
            MetChar => "MET_CHAR",
            MetUChar => "MET_UCHAR",
            MetShort => "MET_SHORT",
            MetUShort => "MET_USHORT",
            MetInt => "MET_INT",
            MetUInt => "MET_UINT",
            MetFloat => "MET_FLOAT",
            MetDouble => "MET_DOUBLE",
        }
    }
}

impl FromStr for ElementType {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ElementType::*;
        Ok(match s {
            "MET_CHAR" => MetChar,
            "MET_UCHAR" => MetUChar,
            "MET_SHORT" => MetShort,
            "MET_USHORT" => MetUShort,
            "MET_INT" => MetInt,
            "MET_UINT" => MetUInt,
            "MET_FLOAT" => MetFloat,
            "MET_DOUBLE" => MetDouble,
            _ => {
                return Err(FlowError::InvalidValue {
                    key: "ElementType",
                    expected: "MET_FLOAT",
                    found: s.to_string(),
                })
            }
        })
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Length units found in ComSol exports.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum LengthUnit {
    /// metre
    Metre,
    /// decimetre
    Decimetre,
    /// centimetre
    Centimetre,
    /// millimetre
    Millimetre,
    /// micrometre
    Micrometre,
}

impl LengthUnit {
    /// How many of this unit make up one metre.
    pub fn per_metre(self) -> f64 {
        use LengthUnit::*;
        match self {
            Metre => 1.,
            Decimetre => 10.,
            Centimetre => 100.,
            Millimetre => 1000.,
            Micrometre => 1_000_000.,
        }
    }

    /// Parse a unit symbol. `"um"` is accepted as an ASCII spelling of `"µm"`.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        use LengthUnit::*;
        match symbol {
            "m" => Some(Metre),
            "dm" => Some(Decimetre),
            "cm" => Some(Centimetre),
            "mm" => Some(Millimetre),
            "\u{b5}m" | "\u{3bc}m" | "um" => Some(Micrometre),
            _ => None,
        }
    }
}

/// Velocity units found in ComSol exports: a length unit per second.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct VelocityUnit(pub LengthUnit);

impl VelocityUnit {
    /// How many of this unit make up one metre per second.
    pub fn per_metre_per_second(self) -> f64 {
        self.0.per_metre()
    }

    /// Parse a unit symbol such as `"mm/s"`.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let length = symbol.strip_suffix("/s")?;
        LengthUnit::from_symbol(length).map(VelocityUnit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_type_names() {
        assert_eq!("MET_FLOAT".parse::<ElementType>().unwrap(), ElementType::MetFloat);
        assert_eq!(ElementType::MetDouble.to_string(), "MET_DOUBLE");
        assert_eq!(ElementType::MetFloat.size_of(), 4);
        assert!("FLOAT".parse::<ElementType>().is_err());
    }

    #[test]
    fn unit_symbols() {
        assert_eq!(LengthUnit::from_symbol("mm"), Some(LengthUnit::Millimetre));
        assert_eq!(LengthUnit::from_symbol("\u{b5}m"), Some(LengthUnit::Micrometre));
        assert_eq!(LengthUnit::from_symbol("km"), None);
        assert_eq!(
            VelocityUnit::from_symbol("cm/s"),
            Some(VelocityUnit(LengthUnit::Centimetre))
        );
        assert_eq!(VelocityUnit::from_symbol("cm"), None);
        assert_eq!(VelocityUnit(LengthUnit::Micrometre).per_metre_per_second(), 1e6);
    }
}
