//! Routing identifiers for exported and received triggers.
//!
//! The driver only accepts a closed vocabulary of terminal names; every variant maps onto its
//! exact driver string.

use std::fmt;
use std::str::FromStr;

macro_rules! terminals {
    {
        $( #[$attr:meta] )*
        pub enum $name:ident { $( $variant:ident => $value:literal, )+ }
    } => {
        $( #[$attr] )*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $value, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownTerminal;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $( $value => Ok(Self::$variant), )+
                    _ => Err(UnknownTerminal(value.to_owned())),
                }
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0:?} is not a trigger terminal")]
pub struct UnknownTerminal(pub String);

terminals! {
    /// Where a session exports its start trigger.
    pub enum OutputTerminal {
        None => "VAL_NO_SOURCE",
        PxiTriggerLine0 => "VAL_RTSI_0",
        PxiTriggerLine1 => "VAL_RTSI_1",
        PxiTriggerLine2 => "VAL_RTSI_2",
        PxiTriggerLine3 => "VAL_RTSI_3",
        PxiTriggerLine4 => "VAL_RTSI_4",
        PxiTriggerLine5 => "VAL_RTSI_5",
        PxiTriggerLine6 => "VAL_RTSI_6",
        PxiTriggerLine7 => "VAL_RTSI_7",
        PxiStarTrigger => "VAL_PXI_STAR",
        Pfi0 => "VAL_PFI_0",
        Pfi1 => "VAL_PFI_1",
        Pfi2 => "VAL_PFI_2",
        Pfi3 => "VAL_PFI_3",
        Pfi4 => "VAL_PFI_4",
        Pfi5 => "VAL_PFI_5",
        Pfi6 => "VAL_PFI_6",
        Pfi7 => "VAL_PFI_7",
        ClockOut => "VAL_CLK_OUT",
        Aux0Pfi0 => "VAL_AUX_0_PFI_0",
        Aux0Pfi1 => "VAL_AUX_0_PFI_1",
        Aux0Pfi2 => "VAL_AUX_0_PFI_2",
        Aux0Pfi3 => "VAL_AUX_0_PFI_3",
        Aux0Pfi4 => "VAL_AUX_0_PFI_4",
        Aux0Pfi5 => "VAL_AUX_0_PFI_5",
        Aux0Pfi6 => "VAL_AUX_0_PFI_6",
        Aux0Pfi7 => "VAL_AUX_0_PFI_7",
    }
}

impl Default for OutputTerminal {
    fn default() -> Self {
        Self::None
    }
}

terminals! {
    /// Where a session receives a digital trigger from.
    pub enum TriggerSource {
        Rtsi0 => "VAL_RTSI_0",
        Rtsi1 => "VAL_RTSI_1",
        Rtsi2 => "VAL_RTSI_2",
        Rtsi3 => "VAL_RTSI_3",
        Rtsi4 => "VAL_RTSI_4",
        Rtsi5 => "VAL_RTSI_5",
        Rtsi6 => "VAL_RTSI_6",
        Pfi0 => "VAL_PFI_0",
        Pfi1 => "VAL_PFI_1",
        Pfi2 => "VAL_PFI_2",
        Pfi3 => "VAL_PFI_3",
        Pfi4 => "VAL_PFI_4",
        Pfi5 => "VAL_PFI_5",
        Pfi6 => "VAL_PFI_6",
        Pfi7 => "VAL_PFI_7",
        PxiStarTrigger => "VAL_PXI_STAR",
        Aux0Pfi0 => "VAL_AUX_0_PFI_0",
        Aux0Pfi1 => "VAL_AUX_0_PFI_1",
        Aux0Pfi2 => "VAL_AUX_0_PFI_2",
        Aux0Pfi3 => "VAL_AUX_0_PFI_3",
        Aux0Pfi4 => "VAL_AUX_0_PFI_4",
        Aux0Pfi5 => "VAL_AUX_0_PFI_5",
        Aux0Pfi6 => "VAL_AUX_0_PFI_6",
        Aux0Pfi7 => "VAL_AUX_0_PFI_7",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_driver_strings() {
        assert_eq!(OutputTerminal::None.as_str(), "VAL_NO_SOURCE");
        assert_eq!(OutputTerminal::PxiTriggerLine7.as_str(), "VAL_RTSI_7");
        assert_eq!(OutputTerminal::ClockOut.to_string(), "VAL_CLK_OUT");
        assert_eq!(TriggerSource::Aux0Pfi3.as_str(), "VAL_AUX_0_PFI_3");
        assert_eq!(OutputTerminal::ALL.len(), 27);
        assert_eq!(TriggerSource::ALL.len(), 24);
    }

    #[test]
    fn test_parse() {
        for &terminal in OutputTerminal::ALL {
            assert_eq!(terminal.as_str().parse::<OutputTerminal>(), Ok(terminal));
        }
        assert_eq!("VAL_PFI_0".parse::<TriggerSource>(), Ok(TriggerSource::Pfi0));
        assert!(matches!("PFI0".parse::<OutputTerminal>(), Err(UnknownTerminal(_))));
    }
}
