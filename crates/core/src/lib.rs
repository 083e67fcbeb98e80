use anyhow::Context;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// 投稿ドキュメントを保存しているコレクション名
pub const POSTS_COLLECTION: &str = "posts";

static HASHTAG_REGEX: OnceLock<Regex> = OnceLock::new();

/// ドキュメントストアが返す時刻表現（秒 + ナノ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanoseconds: u32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanoseconds: dt.timestamp_subsec_nanos(),
        }
    }

    /// エポックからのミリ秒
    ///
    /// `seconds * 1000 + nanoseconds / 1e6` を f64 で計算する。
    /// 並び替えはすべてこの値で比較する。
    pub fn instant_millis(&self) -> f64 {
        self.seconds as f64 * 1000.0 + self.nanoseconds as f64 / 1_000_000.0
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanoseconds)
    }
}

/// 作成時刻を持つレコード（投稿・コメント）
pub trait Timestamped {
    fn timestamp(&self) -> Timestamp;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub author_email: String,
    #[serde(default)]
    pub content: String,
    pub commented_at: Timestamp,
}

impl Timestamped for Comment {
    fn timestamp(&self) -> Timestamp {
        self.commented_at
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// ストアが採番した ID。ドキュメント本体には含まれない
    #[serde(default)]
    pub id: String,
    pub owner_email: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

impl Post {
    /// スナップショット中のドキュメントを Post に変換し、ストアの ID を付与する
    pub fn from_document(id: &str, data: serde_json::Value) -> anyhow::Result<Self> {
        let mut post: Post = serde_json::from_value(data)
            .with_context(|| format!("Failed to decode post document {}", id))?;
        post.id = id.to_string();
        Ok(post)
    }
}

impl Timestamped for Post {
    fn timestamp(&self) -> Timestamp {
        self.created_at
    }
}

/// 現在の閲覧者。未ログインの場合は `Option::None` で表す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerIdentity {
    pub email: String,
}

impl ViewerIdentity {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: String,
}

/// ハッシュタグ判定
///
/// 正規表現: `^#[0-9a-z_]*[0-9a-z]+[0-9a-z_]*$`
/// - 小文字英数字とアンダースコアのみ
/// - 英数字を最低1文字含む
pub fn is_hashtag(token: &str) -> bool {
    let regex = HASHTAG_REGEX
        .get_or_init(|| Regex::new(r"^#[0-9a-z_]*[0-9a-z]+[0-9a-z_]*$").unwrap());
    regex.is_match(token)
}

/// キャプションからハッシュタグを抽出する（改行→空白で分割、出現順で重複除去）
pub fn extract_hashtags(caption: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    caption
        .split('\n')
        .flat_map(|line| line.split(' '))
        .filter(|token| is_hashtag(token))
        .filter(|token| seen.insert(*token))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// 秒+ナノ秒がミリ秒に正しく換算されるか検証
    #[test]
    fn test_instant_millis() {
        assert_eq!(Timestamp::new(100, 500_000_000).instant_millis(), 100_500.0);
        assert_eq!(Timestamp::new(100, 0).instant_millis(), 100_000.0);
        assert_eq!(Timestamp::new(0, 1).instant_millis(), 0.000001);
        assert!(
            Timestamp::new(100, 500_000_000).instant_millis()
                > Timestamp::new(100, 0).instant_millis()
        );
    }

    #[test]
    fn test_timestamp_datetime_conversion() {
        let dt = "2018-07-23T12:00:00.250Z".parse::<DateTime<Utc>>().unwrap();
        let ts = Timestamp::from_datetime(dt);
        assert_eq!(ts.seconds, 1_532_347_200);
        assert_eq!(ts.nanoseconds, 250_000_000);
        assert_eq!(ts.to_datetime(), Some(dt));
    }

    /// ドキュメントから Post への変換（ID 付与・省略フィールドの既定値）
    #[test]
    fn test_post_from_document() {
        let data = json!({
            "owner_email": "x@x.com",
            "is_private": true,
            "caption": "hello world",
            "images": ["file:///tmp/a.jpg"],
            "created_at": { "seconds": 100, "nanoseconds": 0 },
            "comments": [
                {
                    "author_email": "y@y.com",
                    "content": "nice",
                    "commented_at": { "seconds": 120, "nanoseconds": 0 }
                }
            ]
        });

        let post = Post::from_document("abc", data).unwrap();
        assert_eq!(post.id, "abc");
        assert!(post.is_private);
        assert_eq!(post.comments.len(), 1);
        assert_eq!(post.comments[0].content, "nice");
        assert!(post.hashtags.is_empty());
    }

    #[test]
    fn test_post_from_document_rejects_malformed() {
        // created_at がない
        let data = json!({ "owner_email": "x@x.com", "caption": "no time" });
        assert!(Post::from_document("broken", data).is_err());
    }

    #[test]
    fn test_is_hashtag() {
        // Should match
        assert!(is_hashtag("#love"));
        assert!(is_hashtag("#day_1"));
        assert!(is_hashtag("#_panda"));
        assert!(is_hashtag("#2024"));

        // Should NOT match
        assert!(!is_hashtag("#"));
        assert!(!is_hashtag("#___"));
        assert!(!is_hashtag("#Love"));
        assert!(!is_hashtag("love"));
        assert!(!is_hashtag("#love!"));
        assert!(!is_hashtag("a#love"));
    }

    /// 改行・空白区切りで抽出し、出現順のまま重複が除かれるか検証
    #[test]
    fn test_extract_hashtags() {
        let caption = "Trip to the sea #beach #summer\n#beach again #Sunset\n\n#day_1";
        assert_eq!(
            extract_hashtags(caption),
            vec!["#beach", "#summer", "#day_1"]
        );

        assert!(extract_hashtags("").is_empty());
        assert!(extract_hashtags("no tags here").is_empty());
    }
}
