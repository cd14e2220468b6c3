//! Static rewrite rules: stopword cleaning, time anchoring, synonyms.
//!
//! Every rule is a data table; adding a phrase or synonym never touches
//! control flow.

use chrono::{Days, NaiveDate};

/// Words and phrases that add nothing to a search query.
const STOPWORDS: &[&str] = &[
    "的", "了", "是", "在", "有", "和", "与", "及", "或", "等", "什么", "怎么", "如何", "哪些",
    "哪个", "能", "可以", "请", "帮我", "告诉我", "搜索", "查找", "查询",
];

/// How precisely a fuzzy time phrase is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// `YYYY年MM月`
    Month,
    /// `MM月DD日`
    Day,
}

/// One fuzzy time phrase and the calendar value it is replaced with.
#[derive(Debug, Clone, Copy)]
pub struct TimeAnchor {
    /// The phrase as it appears in queries; an optional trailing `的` is
    /// consumed with it.
    pub phrase: &'static str,
    /// Rendering precision.
    pub granularity: Granularity,
    /// Days before today the phrase refers to.
    pub days_back: u64,
}

impl TimeAnchor {
    const fn new(phrase: &'static str, granularity: Granularity, days_back: u64) -> Self {
        Self {
            phrase,
            granularity,
            days_back,
        }
    }

    /// Render the concrete date for `today`.
    pub fn render(&self, today: NaiveDate) -> String {
        let date = today
            .checked_sub_days(Days::new(self.days_back))
            .unwrap_or(today);
        match self.granularity {
            Granularity::Month => date.format("%Y年%m月").to_string(),
            Granularity::Day => date.format("%m月%d日").to_string(),
        }
    }
}

/// Fuzzy time phrases, checked in order.
pub const TIME_ANCHORS: &[TimeAnchor] = &[
    TimeAnchor::new("最新", Granularity::Month, 0),
    TimeAnchor::new("今天", Granularity::Day, 0),
    TimeAnchor::new("昨天", Granularity::Day, 1),
    TimeAnchor::new("昨晚", Granularity::Day, 1),
    TimeAnchor::new("今晚", Granularity::Day, 0),
    TimeAnchor::new("近期", Granularity::Month, 0),
    TimeAnchor::new("最近", Granularity::Month, 0),
    TimeAnchor::new("刚刚", Granularity::Day, 0),
    TimeAnchor::new("本周", Granularity::Month, 0),
    TimeAnchor::new("这几天", Granularity::Day, 0),
];

/// Domain terms and their synonyms, best first. Only the first two
/// synonyms of each term are used.
pub const SYNONYMS: &[(&str, &[&str])] = &[
    ("模型发布", &["大模型发布", "AI模型上线", "LLM发布"]),
    ("模型", &["大模型", "LLM"]),
    ("人工智能", &["AI", "人工智能"]),
    ("发布", &["上线", "推出", "开源"]),
    ("评测", &["测评", "对比", "benchmark"]),
    ("开源", &["开源", "open source"]),
    ("热点", &["热搜", "热门", "热议"]),
    ("新闻", &["资讯", "快讯", "报道"]),
    ("教程", &["指南", "入门", "使用方法"]),
];

/// Synonyms used per matched term.
const SYNONYMS_PER_TERM: usize = 2;

/// Remove stopwords, collapsing the gaps they leave into single spaces.
///
/// Falls back to `query` when nothing but stopwords remains.
pub fn remove_stopwords(query: &str) -> String {
    let mut by_length: Vec<&str> = STOPWORDS.to_vec();
    by_length.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));

    let mut cleaned = query.to_owned();
    for word in by_length {
        cleaned = cleaned.replace(word, " ");
    }
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        query.to_owned()
    } else {
        collapsed
    }
}

/// One variant per fuzzy time phrase found in `query`, with every
/// occurrence of the phrase (and a trailing `的`) replaced by a date.
pub fn time_anchor_variants(query: &str, today: NaiveDate) -> Vec<String> {
    TIME_ANCHORS
        .iter()
        .filter(|anchor| query.contains(anchor.phrase))
        .filter_map(|anchor| {
            let date = anchor.render(today);
            let with_particle = format!("{}的", anchor.phrase);
            let replaced = query
                .replace(&with_particle, &date)
                .replace(anchor.phrase, &date);
            let replaced = replaced.trim();
            (!replaced.is_empty() && replaced != query).then(|| replaced.to_owned())
        })
        .collect()
}

/// For each table term present in `query`, replace its first occurrence
/// with each of its leading synonyms.
pub fn synonym_variants(query: &str) -> Vec<String> {
    SYNONYMS
        .iter()
        .filter(|(term, _)| query.contains(term))
        .flat_map(|(term, synonyms)| {
            synonyms
                .iter()
                .take(SYNONYMS_PER_TERM)
                .map(move |synonym| query.replacen(term, synonym, 1))
        })
        .filter(|expanded| expanded != query)
        .collect()
}
