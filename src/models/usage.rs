use serde::{Deserialize, Serialize};

pub const GOOGLE_DAILY_LIMIT: i32 = 50;
pub const YELP_DAILY_LIMIT: i32 = 450;
pub const LLM_DAILY_LIMIT: i32 = 200;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiProvider {
    Google,
    Yelp,
    Llm,
}

impl ApiProvider {
    pub fn daily_limit(&self) -> i32 {
        match self {
            ApiProvider::Google => GOOGLE_DAILY_LIMIT,
            ApiProvider::Yelp => YELP_DAILY_LIMIT,
            ApiProvider::Llm => LLM_DAILY_LIMIT,
        }
    }

    pub fn usage_column(&self) -> &'static str {
        match self {
            ApiProvider::Google => "google_calls",
            ApiProvider::Yelp => "yelp_calls",
            ApiProvider::Llm => "llm_calls",
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct DailyApiUsage {
    pub date: String,
    pub google_calls: i32,
    pub yelp_calls: i32,
    pub llm_calls: i32,
}

impl DailyApiUsage {
    pub fn empty(date: String) -> Self {
        Self {
            date,
            google_calls: 0,
            yelp_calls: 0,
            llm_calls: 0,
        }
    }

    pub fn calls_for(&self, provider: ApiProvider) -> i32 {
        match provider {
            ApiProvider::Google => self.google_calls,
            ApiProvider::Yelp => self.yelp_calls,
            ApiProvider::Llm => self.llm_calls,
        }
    }

    pub fn is_below_limit(&self, provider: ApiProvider) -> bool {
        self.calls_for(provider) < provider.daily_limit()
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct ProviderUsage {
    pub used: i32,
    pub limit: i32,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct UsageSummary {
    pub google: ProviderUsage,
    pub yelp: ProviderUsage,
    pub llm: ProviderUsage,
}

impl UsageSummary {
    pub fn from_usage(usage: &DailyApiUsage) -> Self {
        Self {
            google: ProviderUsage {
                used: usage.google_calls,
                limit: GOOGLE_DAILY_LIMIT,
            },
            yelp: ProviderUsage {
                used: usage.yelp_calls,
                limit: YELP_DAILY_LIMIT,
            },
            llm: ProviderUsage {
                used: usage.llm_calls,
                limit: LLM_DAILY_LIMIT,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_limit_boundaries() {
        let mut usage = DailyApiUsage::empty("2025-01-01".to_string());
        assert!(usage.is_below_limit(ApiProvider::Google));
        assert!(usage.is_below_limit(ApiProvider::Yelp));
        assert!(usage.is_below_limit(ApiProvider::Llm));

        usage.google_calls = GOOGLE_DAILY_LIMIT - 1;
        assert!(usage.is_below_limit(ApiProvider::Google));

        usage.google_calls = GOOGLE_DAILY_LIMIT;
        assert!(!usage.is_below_limit(ApiProvider::Google));

        usage.llm_calls = LLM_DAILY_LIMIT;
        assert!(!usage.is_below_limit(ApiProvider::Llm));
        assert!(usage.is_below_limit(ApiProvider::Yelp));
    }

    #[test]
    fn test_summary_reports_caps() {
        let usage = DailyApiUsage {
            date: "2025-01-01".to_string(),
            google_calls: 3,
            yelp_calls: 10,
            llm_calls: 199,
        };
        let summary = UsageSummary::from_usage(&usage);
        assert_eq!(summary.google.used, 3);
        assert_eq!(summary.google.limit, 50);
        assert_eq!(summary.yelp.limit, 450);
        assert_eq!(summary.llm.used, 199);
        assert_eq!(summary.llm.limit, 200);
    }
}
