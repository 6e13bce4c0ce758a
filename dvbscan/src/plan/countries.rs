//! ISO 3166-1 country table and the per-country choice of scan type and
//! channel list.

use dvbscan_protocol::{ScanError, ScanType};

use super::ChannelList;

/// ATSC modulation selection: VSB only, QAM only, or both.
pub const ATSC_TYPE_VSB: u8 = 0;
pub const ATSC_TYPE_QAM: u8 = 1;
pub const ATSC_TYPE_BOTH: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Country {
    /// ISO 3166-1 alpha-2.
    pub alpha2: &'static str,
    pub name: &'static str,
    /// ISO 3166-1 alpha-3, used to select NorDig/Singapore LCN lists.
    pub alpha3: &'static str,
}

impl Country {
    const fn new(alpha2: &'static str, name: &'static str, alpha3: &'static str) -> Self {
        Self {
            alpha2,
            name,
            alpha3,
        }
    }
}

/// Countries sorted by long name.
pub static COUNTRIES: &[Country] = &[
    Country::new("AF", "AFGHANISTAN", "AFG"),
    Country::new("AX", "ÅLAND ISLANDS", "ALA"),
    Country::new("AL", "ALBANIA", "ALB"),
    Country::new("DZ", "ALGERIA", "DZA"),
    Country::new("AS", "AMERICAN SAMOA", "ASM"),
    Country::new("AD", "ANDORRA", "AND"),
    Country::new("AO", "ANGOLA", "AGO"),
    Country::new("AI", "ANGUILLA", "AIA"),
    Country::new("AQ", "ANTARCTICA", "ATA"),
    Country::new("AG", "ANTIGUA AND BARBUDA", "ATG"),
    Country::new("AR", "ARGENTINA", "ARG"),
    Country::new("AM", "ARMENIA", "ARM"),
    Country::new("AW", "ARUBA", "ABW"),
    Country::new("AU", "AUSTRALIA", "AUS"),
    Country::new("AT", "AUSTRIA", "AUT"),
    Country::new("AZ", "AZERBAIJAN", "AZE"),
    Country::new("BS", "BAHAMAS", "BHS"),
    Country::new("BH", "BAHRAIN", "BHR"),
    Country::new("BD", "BANGLADESH", "BGD"),
    Country::new("BB", "BARBADOS", "BRB"),
    Country::new("BY", "BELARUS", "BLR"),
    Country::new("BE", "BELGIUM", "BEL"),
    Country::new("BZ", "BELIZE", "BLZ"),
    Country::new("BJ", "BENIN", "BEN"),
    Country::new("BM", "BERMUDA", "BMU"),
    Country::new("BT", "BHUTAN", "BTN"),
    Country::new("BO", "BOLIVIA", "BOL"),
    Country::new("BQ", "BONAIRE", "BES"),
    Country::new("BA", "BOSNIA AND HERZEGOVINA", "BIH"),
    Country::new("BW", "BOTSWANA", "BWA"),
    Country::new("BV", "BOUVET ISLAND", "BVT"),
    Country::new("BR", "BRAZIL", "BRA"),
    Country::new("IO", "BRITISH INDIAN OCEAN TERRITORY", "IOT"),
    Country::new("BN", "BRUNEI DARUSSALAM", "BRN"),
    Country::new("BG", "BULGARIA", "BGR"),
    Country::new("BF", "BURKINA FASO", "BFA"),
    Country::new("BI", "BURUNDI", "BDI"),
    Country::new("KH", "CAMBODIA", "KHM"),
    Country::new("CM", "CAMEROON", "CMR"),
    Country::new("CA", "CANADA", "CAN"),
    Country::new("CV", "CAPE VERDE", "CPV"),
    Country::new("KY", "CAYMAN ISLANDS", "CYM"),
    Country::new("CF", "CENTRAL AFRICAN REPUBLIC", "CAF"),
    Country::new("TD", "CHAD", "TCD"),
    Country::new("CL", "CHILE", "CHL"),
    Country::new("CN", "CHINA", "CHN"),
    Country::new("CX", "CHRISTMAS ISLAND", "CXR"),
    Country::new("CC", "COCOS (KEELING) ISLANDS", "CCK"),
    Country::new("CO", "COLOMBIA", "COL"),
    Country::new("KM", "COMOROS", "COM"),
    Country::new("CG", "CONGO", "COG"),
    Country::new("CD", "CONGO, THE DEMOCRATIC REPUBLIC OF THE", "COD"),
    Country::new("CK", "COOK ISLANDS", "COK"),
    Country::new("CR", "COSTA RICA", "CRI"),
    Country::new("CI", "CÔTE D'IVOIRE", "CIV"),
    Country::new("HR", "CROATIA", "HRV"),
    Country::new("CU", "CUBA", "CUB"),
    Country::new("CW", "CURAÇAO", "CUW"),
    Country::new("CY", "CYPRUS", "CYP"),
    Country::new("CZ", "CZECH REPUBLIC", "CZE"),
    Country::new("DK", "DENMARK", "DNK"),
    Country::new("DJ", "DJIBOUTI", "DJI"),
    Country::new("DM", "DOMINICA", "DMA"),
    Country::new("DO", "DOMINICAN REPUBLIC", "DOM"),
    Country::new("EC", "ECUADOR", "ECU"),
    Country::new("EG", "EGYPT", "EGY"),
    Country::new("SV", "EL SALVADOR", "SLV"),
    Country::new("GQ", "EQUATORIAL GUINEA", "GNQ"),
    Country::new("ER", "ERITREA", "ERI"),
    Country::new("EE", "ESTONIA", "EST"),
    Country::new("ET", "ETHIOPIA", "ETH"),
    Country::new("FK", "FALKLAND ISLANDS (MALVINAS)", "FLK"),
    Country::new("FO", "FAROE ISLANDS", "FRO"),
    Country::new("FJ", "FIJI", "FJI"),
    Country::new("FI", "FINLAND", "FIN"),
    Country::new("FR", "FRANCE", "FRA"),
    Country::new("GF", "FRENCH GUIANA", "GUF"),
    Country::new("PF", "FRENCH POLYNESIA", "PYF"),
    Country::new("TF", "FRENCH SOUTHERN TERRITORIES", "ATF"),
    Country::new("GA", "GABON", "GAB"),
    Country::new("GM", "GAMBIA", "GMB"),
    Country::new("GE", "GEORGIA", "GEO"),
    Country::new("DE", "GERMANY", "DEU"),
    Country::new("GH", "GHANA", "GHA"),
    Country::new("GI", "GIBRALTAR", "GIB"),
    Country::new("GR", "GREECE", "GRC"),
    Country::new("GL", "GREENLAND", "GRL"),
    Country::new("GD", "GRENADA", "GRD"),
    Country::new("GP", "GUADELOUPE", "GLP"),
    Country::new("GU", "GUAM", "GUM"),
    Country::new("GT", "GUATEMALA", "GTM"),
    Country::new("GG", "GUERNSEY", "GGY"),
    Country::new("GN", "GUINEA", "GIN"),
    Country::new("GW", "GUINEA-BISSAU", "GNB"),
    Country::new("GY", "GUYANA", "GUY"),
    Country::new("HT", "HAITI", "HTI"),
    Country::new("HM", "HEARD ISLAND AND MCDONALD ISLANDS", "HMD"),
    Country::new("VA", "HOLY SEE (VATICAN CITY STATE)", "VAT"),
    Country::new("HN", "HONDURAS", "HND"),
    Country::new("HK", "HONG KONG", "HKG"),
    Country::new("HU", "HUNGARY", "HUN"),
    Country::new("IS", "ICELAND", "ISL"),
    Country::new("IN", "INDIA", "IND"),
    Country::new("ID", "INDONESIA", "IDN"),
    Country::new("IR", "IRAN, ISLAMIC REPUBLIC OF", "IRN"),
    Country::new("IQ", "IRAQ", "IRQ"),
    Country::new("IE", "IRELAND", "IRL"),
    Country::new("IM", "ISLE OF MAN", "IMN"),
    Country::new("IL", "ISRAEL", "ISR"),
    Country::new("IT", "ITALY", "ITA"),
    Country::new("JM", "JAMAICA", "JAM"),
    Country::new("JP", "JAPAN", "JPN"),
    Country::new("JE", "JERSEY", "JEY"),
    Country::new("JO", "JORDAN", "JOR"),
    Country::new("KZ", "KAZAKHSTAN", "KAZ"),
    Country::new("KE", "KENYA", "KEN"),
    Country::new("KI", "KIRIBATI", "KIR"),
    Country::new("KP", "KOREA, DEMOCRATIC PEOPLE'S REPUBLIC OF", "PRK"),
    Country::new("KR", "KOREA, REPUBLIC OF", "KOR"),
    Country::new("KW", "KUWAIT", "KWT"),
    Country::new("KG", "KYRGYZSTAN", "KGZ"),
    Country::new("LA", "LAO PEOPLE'S DEMOCRATIC REPUBLIC", "LAO"),
    Country::new("LV", "LATVIA", "LVA"),
    Country::new("LB", "LEBANON", "LBN"),
    Country::new("LS", "LESOTHO", "LSO"),
    Country::new("LR", "LIBERIA", "LBR"),
    Country::new("LY", "LIBYAN ARAB JAMAHIRIYA", "LBY"),
    Country::new("LI", "LIECHTENSTEIN", "LIE"),
    Country::new("LT", "LITHUANIA", "LTU"),
    Country::new("LU", "LUXEMBOURG", "LUX"),
    Country::new("MO", "MACAO", "MAC"),
    Country::new("MK", "MACEDONIA, THE FORMER YUGOSLAV REPUBLIC OF", "MKD"),
    Country::new("MG", "MADAGASCAR", "MDG"),
    Country::new("MW", "MALAWI", "MWI"),
    Country::new("MY", "MALAYSIA", "MYS"),
    Country::new("MV", "MALDIVES", "MDV"),
    Country::new("ML", "MALI", "MLI"),
    Country::new("MT", "MALTA", "MLT"),
    Country::new("MH", "MARSHALL ISLANDS", "MHL"),
    Country::new("MQ", "MARTINIQUE", "MTQ"),
    Country::new("MR", "MAURITANIA", "MRT"),
    Country::new("MU", "MAURITIUS", "MUS"),
    Country::new("YT", "MAYOTTE", "MYT"),
    Country::new("MX", "MEXICO", "MEX"),
    Country::new("FM", "MICRONESIA, FEDERATED STATES OF", "FSM"),
    Country::new("MD", "MOLDOVA", "MDA"),
    Country::new("MC", "MONACO", "MCO"),
    Country::new("MN", "MONGOLIA", "MNG"),
    Country::new("ME", "MONTENEGRO", "MNE"),
    Country::new("MS", "MONTSERRAT", "MSR"),
    Country::new("MA", "MOROCCO", "MAR"),
    Country::new("MZ", "MOZAMBIQUE", "MOZ"),
    Country::new("MM", "MYANMAR", "MMR"),
    Country::new("NA", "NAMIBIA", "NAM"),
    Country::new("NR", "NAURU", "NRU"),
    Country::new("NP", "NEPAL", "NPL"),
    Country::new("NL", "NETHERLANDS", "NLD"),
    Country::new("NC", "NEW CALEDONIA", "NCL"),
    Country::new("NZ", "NEW ZEALAND", "NZL"),
    Country::new("NI", "NICARAGUA", "NIC"),
    Country::new("NE", "NIGER", "NER"),
    Country::new("NG", "NIGERIA", "NGA"),
    Country::new("NU", "NIUE", "NIU"),
    Country::new("NF", "NORFOLK ISLAND", "NFK"),
    Country::new("MP", "NORTHERN MARIANA ISLANDS", "MNP"),
    Country::new("NO", "NORWAY", "NOR"),
    Country::new("OM", "OMAN", "OMN"),
    Country::new("PK", "PAKISTAN", "PAK"),
    Country::new("PW", "PALAU", "PLW"),
    Country::new("PS", "PALESTINIAN TERRITORY, OCCUPIED", "PSE"),
    Country::new("PA", "PANAMA", "PAN"),
    Country::new("PG", "PAPUA NEW GUINEA", "PNG"),
    Country::new("PY", "PARAGUAY", "PRY"),
    Country::new("PE", "PERU", "PER"),
    Country::new("PH", "PHILIPPINES", "PHL"),
    Country::new("PN", "PITCAIRN", "PCN"),
    Country::new("PL", "POLAND", "POL"),
    Country::new("PT", "PORTUGAL", "PRT"),
    Country::new("PR", "PUERTO RICO", "PRI"),
    Country::new("QA", "QATA", "QAT"),
    Country::new("RE", "RÉUNION", "REU"),
    Country::new("RO", "ROMANIA", "ROU"),
    Country::new("RU", "RUSSIAN FEDERATION", "RUS"),
    Country::new("RW", "RWANDA", "RWA"),
    Country::new("BL", "SAINT BARTHÉLEMY", "BLM"),
    Country::new("SH", "SAINT HELENA", "SHN"),
    Country::new("KN", "SAINT KITTS AND NEVIS", "KNA"),
    Country::new("LC", "SAINT LUCIA", "LCA"),
    Country::new("MF", "SAINT MARTIN", "MAF"),
    Country::new("PM", "SAINT PIERRE AND MIQUELON", "SPM"),
    Country::new("VC", "SAINT VINCENT AND THE GRENADINES", "VCT"),
    Country::new("WS", "SAMOA", "WSM"),
    Country::new("SM", "SAN MARINO", "SMR"),
    Country::new("ST", "SAO TOME AND PRINCIPE", "STP"),
    Country::new("SA", "SAUDI ARABIA", "SAU"),
    Country::new("SN", "SENEGAL", "SEN"),
    Country::new("RS", "SERBIA", "SRB"),
    Country::new("SC", "SEYCHELLES", "SYC"),
    Country::new("SL", "SIERRA LEONE", "SLE"),
    Country::new("SX", "SINT MAARTEN", "SXM"),
    Country::new("SG", "SINGAPORE", "SGP"),
    Country::new("SK", "SLOVAKIA", "SVK"),
    Country::new("SI", "SLOVENIA", "SVN"),
    Country::new("SB", "SOLOMON ISLANDS", "SLB"),
    Country::new("SO", "SOMALIA", "SOM"),
    Country::new("ZA", "SOUTH AFRICA", "ZAF"),
    Country::new("GS", "SOUTH GEORGIA AND THE SOUTH SANDWICH ISLANDS", "SGS"),
    Country::new("ES", "SPAIN", "ESP"),
    Country::new("LK", "SRI LANKA", "LKA"),
    Country::new("SD", "SUDAN", "SDN"),
    Country::new("SR", "SURINAME", "SUR"),
    Country::new("SJ", "SVALBARD AND JAN MAYEN", "SJM"),
    Country::new("SZ", "SWAZILAND", "SWZ"),
    Country::new("SE", "SWEDEN", "SWE"),
    Country::new("CH", "SWITZERLAND", "CHE"),
    Country::new("SY", "SYRIAN ARAB REPUBLIC", "SYR"),
    Country::new("TW", "TAIWAN", "TWN"),
    Country::new("TJ", "TAJIKISTAN", "TJK"),
    Country::new("TZ", "TANZANIA, UNITED REPUBLIC OF", "TZA"),
    Country::new("TH", "THAILAND", "THA"),
    Country::new("TL", "TIMOR-LESTE", "TLS"),
    Country::new("TG", "TOGO", "TGO"),
    Country::new("TK", "TOKELAU", "TKL"),
    Country::new("TO", "TONGA", "TON"),
    Country::new("TT", "TRINIDAD AND TOBAGO", "TTO"),
    Country::new("TN", "TUNISIA", "TUN"),
    Country::new("TR", "TURKEY", "TUR"),
    Country::new("TM", "TURKMENISTAN", "TKM"),
    Country::new("TC", "TURKS AND CAICOS ISLANDS", "TCA"),
    Country::new("TV", "TUVALU", "TUV"),
    Country::new("UG", "UGANDA", "UGA"),
    Country::new("UA", "UKRAINE", "UKR"),
    Country::new("AE", "UNITED ARAB EMIRATES", "ARE"),
    Country::new("GB", "UNITED KINGDOM", "GBR"),
    Country::new("US", "UNITED STATES", "USA"),
    Country::new("UM", "UNITED STATES MINOR OUTLYING ISLANDS", "UMI"),
    Country::new("UY", "URUGUAY", "URY"),
    Country::new("UZ", "UZBEKISTAN", "UZB"),
    Country::new("VU", "VANUATU", "VUT"),
    Country::new("VE", "VENEZUELA", "VEN"),
    Country::new("VN", "VIET NAM", "VNM"),
    Country::new("VG", "VIRGIN ISLANDS, BRITISH", "VGB"),
    Country::new("VI", "VIRGIN ISLANDS, U.S.", "VIR"),
    Country::new("WF", "WALLIS AND FUTUNA", "WLF"),
    Country::new("EH", "WESTERN SAHARA", "ESH"),
    Country::new("YE", "YEMEN", "YEM"),
    Country::new("ZM", "ZAMBIA", "ZMB"),
    Country::new("ZW", "ZIMBABWE", "ZWE"),
];

/// Look up a country by its alpha-2 code (case insensitive).
pub fn find_country(alpha2: &str) -> Option<&'static Country> {
    COUNTRIES
        .iter()
        .find(|c| c.alpha2.eq_ignore_ascii_case(alpha2))
}

/// Select scan type and channel list for a country.
///
/// `requested` is the scan type asked for by the user; only the distinction
/// cable / not cable matters for DVB countries. `atsc_type` is one of the
/// `ATSC_TYPE_*` constants.
pub fn choose_country(
    alpha2: &str,
    atsc_type: u8,
    requested: ScanType,
) -> Result<(ScanType, ChannelList), ScanError> {
    let country = find_country(alpha2).ok_or_else(|| ScanError::UnknownCountry(alpha2.to_string()))?;
    let cable = requested == ScanType::Cable;
    let dvb_type = if cable {
        ScanType::Cable
    } else {
        ScanType::Terrestrial
    };
    let atsc_list = if atsc_type == ATSC_TYPE_QAM {
        ChannelList::AtscQam
    } else {
        ChannelList::AtscVsb
    };

    let choice = match country.alpha2 {
        "AD" | "AT" | "AX" | "BE" | "BG" | "CH" | "CO" | "CZ" | "DE" | "DK" | "EE" | "ES"
        | "GR" | "HR" | "HU" | "HK" | "IE" | "IL" | "IS" | "LT" | "LU" | "LV" | "NL" | "NO"
        | "NZ" | "PT" | "RO" | "SI" | "SK" | "VN" => (
            dvb_type,
            if cable {
                ChannelList::DvbcQam
            } else {
                ChannelList::DvbtDe
            },
        ),
        // Band III in use.
        "IT" | "PL" | "SE" | "RU" => (
            dvb_type,
            if cable {
                ChannelList::DvbcQam
            } else {
                ChannelList::DvbtEuBand3
            },
        ),
        "FI" => (
            dvb_type,
            if cable {
                ChannelList::DvbcFi
            } else {
                ChannelList::DvbtDe
            },
        ),
        "FR" => (
            dvb_type,
            if cable {
                ChannelList::DvbcFr
            } else {
                ChannelList::DvbtFr
            },
        ),
        "GB" => (
            dvb_type,
            if cable {
                ChannelList::DvbcQam
            } else {
                ChannelList::DvbtGb
            },
        ),
        "AU" => {
            if cable {
                return Err(ScanError::UnsupportedScanType(ScanType::Cable as i32));
            }
            (ScanType::Terrestrial, ChannelList::DvbtAu)
        }
        // DVB-T on the ATSC raster.
        "TW" => (dvb_type, atsc_list),
        "US" | "CA" => (ScanType::TerrCableAtsc, atsc_list),
        "BR" => (
            dvb_type,
            if cable {
                ChannelList::DvbcBr
            } else {
                ChannelList::IsdbT6Mhz
            },
        ),
        _ => return Err(ScanError::UnknownCountry(alpha2.to_string())),
    };

    log::info!(
        "using settings for '{}': {} {}",
        country.name,
        choice.0.display_name(),
        choice.1.name()
    );
    Ok(choice)
}
