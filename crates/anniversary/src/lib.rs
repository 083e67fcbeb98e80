//! 交際開始からの経過時間と、二人のプロフィールの組み合わせ

use chrono::{DateTime, Datelike, Months, TimeZone, Utc};
use diary_core::{UserProfile, ViewerIdentity};
use serde::Serialize;

pub const DEFAULT_LOVE_BEGIN: &str = "2018-07-23T12:00:00Z";

// 2018-07-23T12:00:00Z
const DEFAULT_LOVE_BEGIN_SECS: i64 = 1_532_347_200;

pub fn default_love_begin() -> DateTime<Utc> {
    Utc.timestamp_opt(DEFAULT_LOVE_BEGIN_SECS, 0)
        .single()
        .unwrap_or_default()
}

/// 暦の上での経過時間（各単位とも端数は切り捨て）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ElapsedParts {
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl ElapsedParts {
    /// 表示用のラベル付きの値。2以上なら複数形にする
    pub fn labeled(&self) -> Vec<(u32, String)> {
        [
            (self.years, "year"),
            (self.months, "month"),
            (self.days, "day"),
            (self.hours, "hour"),
            (self.minutes, "minute"),
            (self.seconds, "second"),
        ]
        .into_iter()
        .map(|(value, unit)| {
            let label = if value > 1 {
                format!("{}s", unit)
            } else {
                unit.to_string()
            };
            (value, label)
        })
        .collect()
    }
}

/// `start` から `now` までの経過を年・月・日・時・分・秒に分解する
///
/// 月の加算は月末で丸める（1/31 の1か月後は 2/28）。`now` が `start` より前なら全て0。
pub fn elapsed(start: DateTime<Utc>, now: DateTime<Utc>) -> ElapsedParts {
    if now <= start {
        return ElapsedParts::default();
    }

    let mut months =
        (now.year() - start.year()) * 12 + now.month() as i32 - start.month() as i32;
    let mut anchor = add_months(start, months);
    while months > 0 && anchor > now {
        months -= 1;
        anchor = add_months(start, months);
    }

    let rest = (now - anchor).num_seconds();
    ElapsedParts {
        years: (months / 12) as u32,
        months: (months % 12) as u32,
        days: (rest / 86_400) as u32,
        hours: (rest % 86_400 / 3_600) as u32,
        minutes: (rest % 3_600 / 60) as u32,
        seconds: (rest % 60) as u32,
    }
}

fn add_months(start: DateTime<Utc>, months: i32) -> DateTime<Utc> {
    start
        .checked_add_months(Months::new(months.max(0) as u32))
        .unwrap_or(start)
}

/// 閲覧者本人と相手のプロフィールを選ぶ
///
/// 閲覧者がいれば、メールが一致するユーザーが本人、一致しない最初のユーザーが相手。
/// 未ログインなら先頭のユーザーと、それとメールが異なる最初のユーザー。
pub fn find_couple<'a>(
    users: &'a [UserProfile],
    viewer: Option<&ViewerIdentity>,
) -> Option<(&'a UserProfile, &'a UserProfile)> {
    let me = match viewer {
        Some(viewer) => users.iter().find(|u| u.email == viewer.email)?,
        None => users.first()?,
    };
    let partner = users.iter().find(|u| u.email != me.email)?;
    Some((me, partner))
}
