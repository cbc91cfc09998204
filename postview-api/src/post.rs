use anyhow::anyhow;

/// Unix timestamp, in seconds
pub type Time = i64;

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct PostId(pub i64);

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamps are sent either as JSON numbers or as strings
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum RawTime {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawTime {
    /// Parses the integer prefix, so `" 42abc"` is 42 and `12.9` is 12
    pub fn seconds(&self) -> anyhow::Result<Time> {
        match self {
            RawTime::Integer(t) => Ok(*t),
            RawTime::Float(t) if t.is_finite() && t.abs() < i64::MAX as f64 => Ok(t.trunc() as i64),
            RawTime::Float(t) => Err(anyhow!("timestamp {t} is not representable")),
            RawTime::Text(s) => {
                let s = s.trim_start();
                let (sign, digits) = match s.as_bytes().first() {
                    Some(b'-') => (-1, &s[1..]),
                    Some(b'+') => (1, &s[1..]),
                    _ => (1, s),
                };
                let end = digits
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(digits.len());
                if end == 0 {
                    return Err(anyhow!("timestamp {s:?} does not start with an integer"));
                }
                let value: i64 = digits[..end]
                    .parse()
                    .map_err(|e| anyhow!("timestamp {s:?} is out of range: {e}"))?;
                Ok(sign * value)
            }
        }
    }
}

impl From<Time> for RawTime {
    fn from(t: Time) -> RawTime {
        RawTime::Integer(t)
    }
}

/// A post as sent by the server
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct RawPost {
    pub id: PostId,
    pub location: String,
    pub time: RawTime,
    pub author: String,
    pub text: String,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Post {
    pub id: PostId,
    pub location: String,
    pub time: Time,
    pub author: String,
    pub text: String,

    /// UI-only expansion flag, never sent by the server
    #[serde(default)]
    pub open: bool,
}

impl Post {
    pub fn from_raw(raw: RawPost) -> anyhow::Result<Post> {
        let time = raw
            .time
            .seconds()
            .map_err(|e| anyhow!("post {} has an invalid time: {e}", raw.id))?;
        Ok(Post {
            id: raw.id,
            location: raw.location,
            time,
            author: raw.author,
            text: raw.text,
            open: false,
        })
    }
}

impl From<Post> for RawPost {
    fn from(p: Post) -> RawPost {
        RawPost {
            id: p.id,
            location: p.location,
            time: RawTime::Integer(p.time),
            author: p.author,
            text: p.text,
        }
    }
}

pub const POSTS_RETRIEVED_MESSAGE: &str = "Successfully retrieved posts from static file";

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PostsResponse {
    #[serde(default)]
    pub messages: Vec<String>,
    pub data: Vec<RawPost>,
}
