//! Static lookup between the sensor attribute codes (`fatrCode`) reported by the
//! Smart Farm data-mart and their human-readable descriptions.

use std::fmt;

/// A sensor attribute known to the data-mart.
///
/// The descriptions are the column names of the reshaped environment table, so
/// `Attribute::InternalCo2.description()` is the name to pass to
/// [`crate::FarmEnv::render_monthly`] when plotting internal CO2.
///
/// # Examples
///
/// ```
/// use farm_env_viz::Attribute;
///
/// assert_eq!(Attribute::from_code("CI"), Some(Attribute::InternalCo2));
/// assert_eq!(Attribute::InternalCo2.description(), "내부CO2");
/// assert_eq!(Attribute::from_code("??"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Greenhouse air temperature (°C).
    InternalTemperature,
    /// Greenhouse relative humidity (%).
    InternalHumidity,
    /// Greenhouse CO2 concentration (ppm).
    InternalCo2,
    /// Outside air temperature (°C).
    ExternalTemperature,
    /// Outside relative humidity (%).
    ExternalHumidity,
    /// Solar radiation (W/m²).
    SolarRadiation,
    /// Accumulated solar radiation (J/cm²).
    AccumulatedRadiation,
    /// Outside wind speed (m/s).
    WindSpeed,
    /// Outside wind direction (°).
    WindDirection,
    /// Rain detection.
    Rainfall,
    /// Root-zone temperature (°C).
    SoilTemperature,
    /// Root-zone moisture (%).
    SoilMoisture,
    /// Nutrient solution electrical conductivity (dS/m).
    NutrientEc,
    /// Nutrient solution acidity.
    NutrientPh,
    /// Greenhouse dew point (°C).
    DewPoint,
}

impl Attribute {
    pub const ALL: [Attribute; 15] = [
        Attribute::InternalTemperature,
        Attribute::InternalHumidity,
        Attribute::InternalCo2,
        Attribute::ExternalTemperature,
        Attribute::ExternalHumidity,
        Attribute::SolarRadiation,
        Attribute::AccumulatedRadiation,
        Attribute::WindSpeed,
        Attribute::WindDirection,
        Attribute::Rainfall,
        Attribute::SoilTemperature,
        Attribute::SoilMoisture,
        Attribute::NutrientEc,
        Attribute::NutrientPh,
        Attribute::DewPoint,
    ];

    /// Upstream attribute code.
    pub fn code(self) -> &'static str {
        match self {
            Attribute::InternalTemperature => "TI",
            Attribute::InternalHumidity => "HI",
            Attribute::InternalCo2 => "CI",
            Attribute::ExternalTemperature => "TO",
            Attribute::ExternalHumidity => "HO",
            Attribute::SolarRadiation => "SR",
            Attribute::AccumulatedRadiation => "AR",
            Attribute::WindSpeed => "WS",
            Attribute::WindDirection => "WD",
            Attribute::Rainfall => "RF",
            Attribute::SoilTemperature => "ST",
            Attribute::SoilMoisture => "SM",
            Attribute::NutrientEc => "EC",
            Attribute::NutrientPh => "PH",
            Attribute::DewPoint => "DP",
        }
    }

    /// Human-readable name, used as the column name after pivoting.
    pub fn description(self) -> &'static str {
        match self {
            Attribute::InternalTemperature => "내부온도",
            Attribute::InternalHumidity => "내부습도",
            Attribute::InternalCo2 => "내부CO2",
            Attribute::ExternalTemperature => "외부온도",
            Attribute::ExternalHumidity => "외부습도",
            Attribute::SolarRadiation => "일사량",
            Attribute::AccumulatedRadiation => "누적일사량",
            Attribute::WindSpeed => "풍속",
            Attribute::WindDirection => "풍향",
            Attribute::Rainfall => "감우",
            Attribute::SoilTemperature => "지온",
            Attribute::SoilMoisture => "지습",
            Attribute::NutrientEc => "양액EC",
            Attribute::NutrientPh => "양액pH",
            Attribute::DewPoint => "이슬점",
        }
    }

    /// Looks up an attribute by its upstream code. Codes are matched after trimming
    /// surrounding whitespace and ignoring ASCII case.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|attribute| attribute.code().eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Resolves an attribute code to its description. Unknown codes pass through unchanged.
pub fn describe_code(code: &str) -> String {
    Attribute::from_code(code)
        .map(|attribute| attribute.description().to_string())
        .unwrap_or_else(|| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_and_descriptions_are_unique() {
        let codes: HashSet<_> = Attribute::ALL.iter().map(|a| a.code()).collect();
        let descriptions: HashSet<_> = Attribute::ALL.iter().map(|a| a.description()).collect();
        assert_eq!(codes.len(), Attribute::ALL.len());
        assert_eq!(descriptions.len(), Attribute::ALL.len());
    }

    #[test]
    fn test_from_code_round_trips_every_attribute() {
        for attribute in Attribute::ALL {
            assert_eq!(Attribute::from_code(attribute.code()), Some(attribute));
        }
        assert_eq!(Attribute::from_code(" ci "), Some(Attribute::InternalCo2));
    }

    #[test]
    fn test_describe_code_passes_unknown_codes_through() {
        assert_eq!(describe_code("TI"), "내부온도");
        assert_eq!(describe_code("XQ9"), "XQ9");
    }
}
