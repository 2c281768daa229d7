use serde::Serialize;

/// Lifecycle of a view backed by a one-shot fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum ViewState<T, E> {
    #[default]
    Loading,
    Loaded(T),
    Failed(E),
}

impl<T, E> ViewState<T, E> {
    pub fn from_result(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::Loaded(data),
            Err(err) => Self::Failed(err),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Loaded(_) => "loaded",
            Self::Failed(_) => "failed",
        }
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(data) => Some(data),
            _ => None,
        }
    }

    pub fn map<U, F>(self, f: F) -> ViewState<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Loading => ViewState::Loading,
            Self::Loaded(data) => ViewState::Loaded(f(data)),
            Self::Failed(err) => ViewState::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_to_loading() {
        let state: ViewState<Vec<u8>, String> = ViewState::default();
        assert_eq!(state.as_str(), "loading");
        assert_eq!(serde_json::to_value(&state).unwrap(), json!({ "state": "loading" }));
    }

    #[test]
    fn serializes_loaded_and_failed() {
        let loaded: ViewState<Vec<u32>, String> = ViewState::from_result(Ok(vec![1, 2]));
        assert_eq!(
            serde_json::to_value(&loaded).unwrap(),
            json!({ "state": "loaded", "data": [1, 2] })
        );

        let failed: ViewState<Vec<u32>, String> =
            ViewState::from_result(Err("upstream down".to_string()));
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({ "state": "failed", "data": "upstream down" })
        );
    }

    #[test]
    fn map_keeps_failure() {
        let failed: ViewState<u32, &str> = ViewState::Failed("boom");
        let mapped = failed.map(|n| n * 2);
        assert_eq!(mapped, ViewState::Failed("boom"));
        assert_eq!(ViewState::<u32, &str>::Loaded(2).map(|n| n * 2).loaded(), Some(&4));
    }
}
