//! 约定规范定义
//!
//! 提供工厂作用域识别的约定规范

/// 约定规则
#[derive(Debug, Clone)]
pub struct ConventionRule {
    /// 名称模式, 支持单个 `*` 通配
    pub pattern: String,
    /// 匹配时是否视为工厂作用域
    pub factory: bool,
    /// 优先级
    pub priority: i32,
}

impl ConventionRule {
    /// 创建新的约定规则
    pub fn new(pattern: impl Into<String>, factory: bool) -> Self {
        Self {
            pattern: pattern.into(),
            factory,
            priority: 0,
        }
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 检查名称是否匹配此规则
    pub fn matches(&self, name: &str) -> bool {
        if self.pattern.contains('*') {
            // 简单的通配符匹配
            let pattern_parts: Vec<&str> = self.pattern.split('*').collect();

            if pattern_parts.len() == 2 {
                let prefix = pattern_parts[0];
                let suffix = pattern_parts[1];

                name.starts_with(prefix)
                    && name.ends_with(suffix)
                    && name.len() >= prefix.len() + suffix.len()
            } else {
                false
            }
        } else {
            name == self.pattern
        }
    }
}

/// 作用域约定规范
///
/// 子作用域未显式标记为工厂时, 按名称约定判定。
#[derive(Debug)]
pub struct ScopeConventions {
    rules: Vec<ConventionRule>,
}

impl ScopeConventions {
    /// 创建新的作用域约定规范
    pub fn new() -> Self {
        let mut conventions = Self { rules: Vec::new() };
        conventions.register_default_conventions();
        conventions
    }

    /// 注册默认约定
    fn register_default_conventions(&mut self) {
        // 请求作用域约定
        self.add_convention(ConventionRule::new("RequestScope", true).with_priority(100));

        // 请求作用域后缀约定
        self.add_convention(ConventionRule::new("*RequestScope", true).with_priority(90));

        // 工厂后缀约定
        self.add_convention(ConventionRule::new("*Factory", true).with_priority(80));
    }

    /// 添加约定规则
    pub fn add_convention(&mut self, rule: ConventionRule) {
        self.rules.push(rule);
        // 按优先级排序
        self.rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// 获取所有约定规则
    pub fn get_convention_rules(&self) -> &[ConventionRule] {
        &self.rules
    }

    /// 按名称查找匹配的规则
    pub fn find_rule_by_name(&self, name: &str) -> Option<&ConventionRule> {
        self.rules.iter().find(|rule| rule.matches(name))
    }

    /// 按约定判断名称是否为工厂作用域
    pub fn is_factory(&self, name: &str) -> bool {
        self.find_rule_by_name(name)
            .map(|rule| rule.factory)
            .unwrap_or(false)
    }
}

impl Default for ScopeConventions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern_matches() {
        let conventions = ScopeConventions::new();
        assert!(conventions.is_factory("RequestScope"));
    }

    #[test]
    fn test_suffix_pattern_matches() {
        let conventions = ScopeConventions::new();
        assert!(conventions.is_factory("HttpRequestScope"));
        assert!(conventions.is_factory("SessionFactory"));
        assert!(!conventions.is_factory("Database"));
    }

    #[test]
    fn test_custom_rule_priority() {
        let mut conventions = ScopeConventions::new();
        conventions.add_convention(ConventionRule::new("PlainScope", true).with_priority(10));
        assert!(conventions.is_factory("PlainScope"));
    }
}
