//! Canned transcript seeded into a fresh manager.

use serde_json::json;

use crate::models::{ChatSession, Message, QueryResults};

/// Identifier of the seeded session.
pub const DEMO_SESSION_ID: &str = "demo";

pub const DEMO_QUESTION: &str =
    "Show me total revenue by category for orders in the last 30 days";

pub const DEMO_ANSWER: &str =
    "Here's the SQL query to get total revenue by category for the last 30 days:";

pub const DEMO_SQL: &str = "SELECT
  c.name AS category_name,
  SUM(oi.quantity * p.price) AS total_revenue
FROM demo_ecom.order_items oi
JOIN demo_ecom.products p ON oi.product_id = p.id
JOIN demo_ecom.categories c ON p.category_id = c.id
JOIN demo_ecom.orders o ON oi.order_id = o.id
WHERE
  o.placed_at >= NOW() - INTERVAL '30 days'
GROUP BY
  c.name
ORDER BY
  total_revenue DESC;";

/// Build the demo session: one question, one answer with query and a single row.
pub fn demo_session() -> ChatSession {
    let results = QueryResults::new(["category_name", "total_revenue"]).with_row([
        ("category_name", json!("Category 10")),
        ("total_revenue", json!(9036.40)),
    ]);

    ChatSession::new(
        DEMO_SESSION_ID,
        vec![
            Message::user(1, DEMO_QUESTION),
            Message::assistant(2, DEMO_ANSWER)
                .with_sql(DEMO_SQL)
                .with_results(results),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRole;

    #[test]
    fn test_demo_shape() {
        let session = demo_session();
        assert_eq!(session.id, DEMO_SESSION_ID);
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, MessageRole::User);

        let answer = &session.messages[1];
        assert!(answer.sql_code.as_deref().unwrap().starts_with("SELECT"));
        let results = answer.results.as_ref().unwrap();
        assert_eq!(results.data.len(), 1);
        assert_eq!(results.data[0]["category_name"], "Category 10");
        assert_eq!(session.title, "Show me total revenue by categ...");
    }
}
