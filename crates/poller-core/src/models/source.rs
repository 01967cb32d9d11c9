use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum SourceId {
    News,
    Weather,
    Nasa,
}

impl SourceId {
    pub const ALL: [SourceId; 3] = [SourceId::News, SourceId::Weather, SourceId::Nasa];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Weather => "weather",
            Self::Nasa => "nasa",
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == normalized)
            .ok_or(())
    }
}
