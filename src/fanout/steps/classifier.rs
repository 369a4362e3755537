//! Task classification - decides which worker handles a task

/// Maps a task description to a worker label
///
/// Returning `None` means no worker should handle the task.
pub trait TaskClassifier: Send + Sync {
    fn classify(&self, description: &str) -> Option<String>;

    /// Every label `classify` can return
    fn labels(&self) -> Vec<String>;
}

/// Case-insensitive substring rules, checked in order
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    rules: Vec<(String, String)>,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Route descriptions containing `keyword` to `label`
    pub fn rule(mut self, keyword: impl Into<String>, label: impl Into<String>) -> Self {
        self.rules.push((keyword.into().to_lowercase(), label.into()));
        self
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
            .rule("task 1", "worker_1")
            .rule("task 2", "worker_2")
    }
}

impl TaskClassifier for KeywordClassifier {
    fn classify(&self, description: &str) -> Option<String> {
        let description = description.to_lowercase();
        self.rules
            .iter()
            .find(|(keyword, _)| description.contains(keyword.as_str()))
            .map(|(_, label)| label.clone())
    }

    fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for (_, label) in &self.rules {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let classifier = KeywordClassifier::default();
        assert_eq!(classifier.classify("Task 1"), Some("worker_1".to_string()));
        assert_eq!(classifier.classify("do TASK 2 now"), Some("worker_2".to_string()));
        assert_eq!(classifier.classify("Task 3"), None);
        assert_eq!(classifier.labels(), vec!["worker_1", "worker_2"]);
    }

    #[test]
    fn test_first_rule_wins() {
        let classifier = KeywordClassifier::new()
            .rule("Bucket", "storage")
            .rule("lambda", "compute")
            .rule("s3", "storage");
        assert_eq!(
            classifier.classify("Create S3 bucket for Lambda"),
            Some("storage".to_string())
        );
        assert_eq!(classifier.labels(), vec!["storage", "compute"]);
    }
}
