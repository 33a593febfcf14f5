/// Filter/select/order/range query for the hosted REST data API, rendered as
/// PostgREST-style query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    select: Option<String>,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    offset: Option<usize>,
    limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    pub fn eq(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, format!("eq.{}", value.to_string()))
    }

    pub fn neq(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, format!("neq.{}", value.to_string()))
    }

    pub fn in_<I, S>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list: Vec<String> = values
            .into_iter()
            .map(|v| quote_list_value(v.as_ref()))
            .collect();
        self.filter(column, format!("in.({})", list.join(",")))
    }

    /// Case-insensitive pattern match; `*` is the wildcard.
    pub fn ilike(self, column: &str, pattern: &str) -> Self {
        self.filter(column, format!("ilike.{pattern}"))
    }

    pub fn gte(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, format!("gte.{}", value.to_string()))
    }

    pub fn lte(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, format!("lte.{}", value.to_string()))
    }

    pub fn is_null(self, column: &str) -> Self {
        self.filter(column, "is.null".to_string())
    }

    pub fn not_null(self, column: &str) -> Self {
        self.filter(column, "not.is.null".to_string())
    }

    /// Any-of group rendered as `or=(a.op.v,b.op.v)`. Each condition is a
    /// `column.operator.value` triple.
    pub fn or_<I, S>(self, conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = conditions
            .into_iter()
            .map(|c| c.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.filter("or", format!("({joined})"))
    }

    pub fn order(mut self, column: &str, descending: bool) -> Self {
        let direction = if descending { "desc" } else { "asc" };
        self.order.push(format!("{column}.{direction}"));
        self
    }

    /// Inclusive row range, as used for paging.
    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.offset = Some(from);
        self.limit = Some(to.saturating_sub(from) + 1);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn filter(mut self, column: &str, expression: String) -> Self {
        self.filters.push((column.to_string(), expression));
        self
    }

    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        params.push((
            "select".to_string(),
            self.select.clone().unwrap_or_else(|| "*".to_string()),
        ));
        params.extend(self.filters.iter().cloned());
        if !self.order.is_empty() {
            params.push(("order".to_string(), self.order.join(",")));
        }
        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

fn quote_list_value(value: &str) -> String {
    if value.contains([',', '(', ')', '"', ' ']) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
        params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn test_delivery_page_query() {
        let params = Query::new()
            .select("*")
            .eq("campaign_id", "c1")
            .eq("push_attempted", true)
            .order("created_at", true)
            .range(50, 99)
            .to_params();

        assert_eq!(param(&params, "campaign_id"), vec!["eq.c1"]);
        assert_eq!(param(&params, "push_attempted"), vec!["eq.true"]);
        assert_eq!(param(&params, "order"), vec!["created_at.desc"]);
        assert_eq!(param(&params, "offset"), vec!["50"]);
        assert_eq!(param(&params, "limit"), vec!["50"]);
    }

    #[test]
    fn test_or_group() {
        let params = Query::new()
            .or_(["push_attempted.is.null", "push_attempted.eq.false"])
            .to_params();
        assert_eq!(
            param(&params, "or"),
            vec!["(push_attempted.is.null,push_attempted.eq.false)"]
        );
    }

    #[test]
    fn test_in_filter_quotes_awkward_values() {
        let params = Query::new()
            .in_("id", ["a", "b,c", "d\"e"])
            .to_params();
        assert_eq!(param(&params, "id"), vec![r#"in.(a,"b,c","d\"e")"#]);
    }

    #[test]
    fn test_multiple_filters_on_one_column() {
        let params = Query::new()
            .gte("created_at", "2024-01-01")
            .lte("created_at", "2024-01-31")
            .not_null("error")
            .is_null("push_ok")
            .ilike("email", "*@snapwin.app")
            .to_params();

        assert_eq!(
            param(&params, "created_at"),
            vec!["gte.2024-01-01", "lte.2024-01-31"]
        );
        assert_eq!(param(&params, "error"), vec!["not.is.null"]);
        assert_eq!(param(&params, "push_ok"), vec!["is.null"]);
        assert_eq!(param(&params, "email"), vec!["ilike.*@snapwin.app"]);
        assert_eq!(param(&params, "select"), vec!["*"]);
    }
}
