use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A Hatena Bookmark ranking segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Hotentry,
    General,
    Social,
    Economics,
    Life,
    Knowledge,
    It,
    Fun,
    Entertainment,
    Game,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Hotentry,
        Category::General,
        Category::Social,
        Category::Economics,
        Category::Life,
        Category::Knowledge,
        Category::It,
        Category::Fun,
        Category::Entertainment,
        Category::Game,
    ];

    /// The categories published when nothing else is configured.
    pub fn defaults() -> Vec<Category> {
        vec![Category::Hotentry, Category::It, Category::Game]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::Hotentry => "hotentry",
            Self::General => "general",
            Self::Social => "social",
            Self::Economics => "economics",
            Self::Life => "life",
            Self::Knowledge => "knowledge",
            Self::It => "it",
            Self::Fun => "fun",
            Self::Entertainment => "entertainment",
            Self::Game => "game",
        }
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid category: {}. Valid values are: {:?}",
                    s,
                    Category::ALL.map(|c| c.slug())
                )
            })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Publishing cadence. Each variant owns its period arithmetic, dedup
/// namespace and message template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [
        Granularity::Daily,
        Granularity::Weekly,
        Granularity::Monthly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Dedup namespace; one per granularity so that periods never collide
    /// across cadences.
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::Daily => "dailyurl",
            Self::Weekly => "weeklyurl",
            Self::Monthly => "monthlyurl",
        }
    }
}

impl FromStr for Granularity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => anyhow::bail!(
                "Invalid granularity: {}. Valid values are: daily, weekly, monthly",
                other
            ),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! serde_via_str {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                <$ty>::from_str(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

serde_via_str!(Category);
serde_via_str!(Granularity);

/// The calendar window of the most recently completed period.
///
/// `end` is inclusive. Daily windows have no end; monthly windows span the
/// whole calendar month but are reported by month only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindow {
    pub granularity: Granularity,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

/// A resolved period: window plus the canonical ranking URL, which is both
/// the dedup identity and the link embedded in the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub category: Category,
    pub window: PeriodWindow,
    pub canonical_url: String,
}

impl Period {
    pub fn granularity(&self) -> Granularity {
        self.window.granularity
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(self.granularity(), &self.canonical_url)
    }
}

/// Composite dedup identity: `{granularity namespace, canonical URL}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub namespace: &'static str,
    pub url: String,
}

impl DedupKey {
    pub fn new(granularity: Granularity, url: &str) -> Self {
        Self {
            namespace: granularity.namespace(),
            url: url.to_string(),
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.namespace, self.url)
    }
}
