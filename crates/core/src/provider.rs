use serde::{Deserialize, Serialize};
use std::fmt;

/// Banks whose export quirks we know about. `Other` covers everything else
/// and gets the generic CSV treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BankProvider {
    EcobankCemac,
    EcobankUemoa,
    UbaCameroun,
    UbaGroup,
    Sgbc,
    AfrilandFirstBank,
    Boa,
    StandardBank,
    Bicec,
    Other,
}

impl fmt::Display for BankProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BankProvider::EcobankCemac => "Ecobank CEMAC",
            BankProvider::EcobankUemoa => "Ecobank UEMOA",
            BankProvider::UbaCameroun => "UBA Cameroun",
            BankProvider::UbaGroup => "UBA Group",
            BankProvider::Sgbc => "SGBC",
            BankProvider::AfrilandFirstBank => "Afriland First Bank",
            BankProvider::Boa => "Bank of Africa",
            BankProvider::StandardBank => "Standard Bank",
            BankProvider::Bicec => "BICEC",
            BankProvider::Other => "Other",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for BankProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ECOBANK_CEMAC" => Ok(BankProvider::EcobankCemac),
            "ECOBANK_UEMOA" => Ok(BankProvider::EcobankUemoa),
            "UBA_CAMEROUN" => Ok(BankProvider::UbaCameroun),
            "UBA_GROUP" => Ok(BankProvider::UbaGroup),
            "SGBC" => Ok(BankProvider::Sgbc),
            "AFRILAND_FIRST_BANK" => Ok(BankProvider::AfrilandFirstBank),
            "BOA" => Ok(BankProvider::Boa),
            "STANDARD_BANK" => Ok(BankProvider::StandardBank),
            "BICEC" => Ok(BankProvider::Bicec),
            "OTHER" | "UNKNOWN" => Ok(BankProvider::Other),
            other => Err(format!("Unknown bank provider: '{other}'")),
        }
    }
}
