//! Law-enforcement vocabulary tables for Wisconsin
//!
//! Fixed mappings used by query enhancement: officer abbreviations to
//! full legal terms, colloquialisms to the formal terms that appear in
//! statutes and case law, and general topics to statute chapter numbers.

use regex::Regex;
use std::sync::LazyLock;

/// Abbreviation -> full expansion
pub const ABBREVIATIONS: &[(&str, &str)] = &[
    ("OWI", "Operating While Intoxicated"),
    ("OMVWI", "Operating a Motor Vehicle While Intoxicated"),
    ("OAR", "Operating After Revocation"),
    ("OAS", "Operating After Suspension"),
    ("BOLO", "Be On the Lookout"),
    ("EDP", "Emotionally Disturbed Person"),
    ("DV", "Domestic Violence"),
    ("DUI", "Driving Under the Influence"),
    ("BAC", "Blood Alcohol Concentration"),
    ("FTA", "Failure to Appear"),
    ("LESB", "Law Enforcement Standards Board"),
    ("DOJ", "Department of Justice"),
    ("DA", "District Attorney"),
    ("ADA", "Assistant District Attorney"),
    ("OIS", "Officer Involved Shooting"),
    ("SRO", "School Resource Officer"),
    ("K9", "Canine Unit"),
    ("SWAT", "Special Weapons and Tactics"),
    ("FTO", "Field Training Officer"),
    ("MVA", "Motor Vehicle Accident"),
    ("PBT", "Preliminary Breath Test"),
    ("SFSTs", "Standardized Field Sobriety Tests"),
    ("CCW", "Carrying a Concealed Weapon"),
    ("PC", "Probable Cause"),
    ("RS", "Reasonable Suspicion"),
    ("MOU", "Memorandum of Understanding"),
    ("SOP", "Standard Operating Procedure"),
    ("UOF", "Use of Force"),
    ("CIT", "Crisis Intervention Team"),
    ("AODA", "Alcohol and Other Drug Abuse"),
    ("TRO", "Temporary Restraining Order"),
    ("OC", "Oleoresin Capsicum"),
    ("ECD", "Electronic Control Device"),
    ("LEO", "Law Enforcement Officer"),
    ("PAT", "Pre-trial Assessment Tool"),
];

/// Informal phrase -> formal equivalents
pub const COLLOQUIAL_TO_LEGAL: &[(&str, &[&str])] = &[
    ("pulled over", &["traffic stop", "Terry stop", "investigatory stop"]),
    ("drunk driving", &["operating while intoxicated", "OWI", "OMVWI"]),
    ("speeding", &["exceeding speed limit", "speed violation"]),
    ("running a red light", &["failure to obey traffic signal"]),
    ("hit and run", &["duty upon striking", "failure to report accident"]),
    ("road rage", &["aggressive driving", "reckless driving"]),
    ("resisting arrest", &["resisting or obstructing an officer"]),
    ("shoplifting", &["retail theft", "theft"]),
    ("breaking and entering", &["burglary", "unlawful entry"]),
    ("assault", &["battery", "substantial battery", "aggravated battery"]),
    ("murder", &["first degree intentional homicide", "homicide"]),
    (
        "manslaughter",
        &["second degree reckless homicide", "homicide by negligent operation"],
    ),
    (
        "drug possession",
        &["possession of controlled substance", "controlled substance"],
    ),
    (
        "car theft",
        &["operating vehicle without consent", "theft of motor vehicle"],
    ),
    ("trespassing", &["criminal trespass", "trespass to land"]),
    ("domestic abuse", &["domestic violence", "domestic abuse"]),
    (
        "restraining order",
        &["temporary restraining order", "TRO", "injunction"],
    ),
    ("bail", &["bond", "bail jumping", "conditions of release"]),
    ("jaywalking", &["pedestrian violation", "failure to yield"]),
    ("fleeing", &["fleeing or eluding an officer", "vehicle pursuit"]),
    (
        "terry stop",
        &[
            "Terry stop",
            "investigatory stop",
            "investigative detention",
            "reasonable suspicion stop",
        ],
    ),
    (
        "stop and frisk",
        &["Terry frisk", "protective search", "pat down search"],
    ),
    ("owi", &["operating while intoxicated", "OWI", "OMVWI", "drunk driving"]),
    (
        "field sobriety",
        &["standardized field sobriety test", "SFST", "field sobriety"],
    ),
    ("pat down", &["Terry frisk", "protective search"]),
    ("miranda", &["Miranda warning", "custodial interrogation rights"]),
    ("search warrant", &["search warrant", "warrant execution"]),
    ("no knock", &["no-knock warrant", "forced entry warrant"]),
    ("use of force", &["use of force", "reasonable force", "deadly force"]),
    ("taser", &["electronic control device", "conducted energy weapon"]),
    ("pepper spray", &["oleoresin capsicum", "OC spray", "chemical agent"]),
    ("high speed chase", &["vehicle pursuit", "fleeing or eluding"]),
    ("dwi", &["operating while intoxicated", "OWI"]),
    ("dui", &["operating while intoxicated", "OWI"]),
];

/// General topic -> Wisconsin statute chapter numbers
pub const TOPIC_TO_CHAPTERS: &[(&str, &[&str])] = &[
    ("traffic", &["346"]),
    (
        "criminal",
        &["939", "940", "941", "942", "943", "944", "945", "946", "947", "948"],
    ),
    ("homicide", &["940"]),
    ("theft", &["943"]),
    ("drugs", &["961"]),
    ("alcohol", &["125", "346"]),
    ("weapons", &["941"]),
    ("domestic", &["813", "968"]),
    ("juvenile", &["938"]),
    ("police powers", &["175", "968"]),
    ("terry stop", &["968"]),
    ("stop and frisk", &["968"]),
    ("use of force", &["939"]),
    ("field sobriety", &["343", "346"]),
    ("owi", &["346"]),
    ("sexual", &["940", "944", "948"]),
    ("burglary", &["943"]),
    ("fraud", &["943"]),
];

/// Whole-word, case-insensitive matchers for each abbreviation,
/// compiled once.
static ABBREVIATION_MATCHERS: LazyLock<Vec<(Regex, &'static str, &'static str)>> =
    LazyLock::new(|| {
        ABBREVIATIONS
            .iter()
            .map(|(abbr, full)| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(abbr));
                // Patterns are built from the fixed table above; compilation
                // cannot fail on escaped literals.
                (Regex::new(&pattern).expect("abbreviation pattern"), *abbr, *full)
            })
            .collect()
    });

/// Replace known abbreviations with `ABBR (Full Expansion)` so both
/// forms are searchable. Whole-word, case-insensitive.
pub fn expand_abbreviations(text: &str) -> String {
    let mut result = text.to_string();
    for (matcher, abbr, full) in ABBREVIATION_MATCHERS.iter() {
        if matcher.is_match(&result) {
            let replacement = format!("{} ({})", abbr, full);
            result = matcher.replace_all(&result, replacement.as_str()).into_owned();
        }
    }
    result
}

/// Formal legal synonyms for informal terms found in the query,
/// deduplicated in discovery order.
pub fn legal_synonyms(query: &str) -> Vec<String> {
    let query_lower = query.to_lowercase();
    let mut synonyms: Vec<String> = Vec::new();
    for (informal, formals) in COLLOQUIAL_TO_LEGAL {
        if query_lower.contains(informal) {
            for formal in *formals {
                if !synonyms.iter().any(|s| s == formal) {
                    synonyms.push((*formal).to_string());
                }
            }
        }
    }
    synonyms
}

/// Statute chapter numbers relevant to topics mentioned in the query.
pub fn chapter_hints(query: &str) -> Vec<String> {
    let query_lower = query.to_lowercase();
    let mut chapters: Vec<String> = Vec::new();
    for (topic, nums) in TOPIC_TO_CHAPTERS {
        if query_lower.contains(topic) {
            for num in *nums {
                if !chapters.iter().any(|c| c == num) {
                    chapters.push((*num).to_string());
                }
            }
        }
    }
    chapters
}
