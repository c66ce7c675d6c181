//! Offline fixtures: one canned plan and one result table per enterprise system.
//!
//! Unknown base ids resolve to the Salesforce fixture.

use crate::error::Result;
use crate::plan::{ChartType, QueryPlan};
use polars::prelude::*;

struct CannedPlan {
    base_id: &'static str,
    sql: &'static str,
    explanation: &'static str,
    x_col: &'static str,
    y_col: &'static str,
    followups: [&'static str; 3],
}

const CANNED_PLANS: &[CannedPlan] = &[
    CannedPlan {
        base_id: "salesforce",
        sql: "SELECT stage, COUNT(*) AS deal_count, SUM(amount) AS total_value\nFROM `erp_poc.sf_opportunities`\nGROUP BY stage ORDER BY total_value DESC",
        explanation: "I analysed the Salesforce opportunity pipeline. **Closed Won** leads at $3.2M across 22 deals, while **Proposal** stage has $2.1M indicating a strong pipeline. The **Closed Lost** rate is relatively low, suggesting effective qualification.",
        x_col: "stage",
        y_col: "total_value",
        followups: [
            "What is the average deal size by region?",
            "Show win rate trend over last 6 months",
            "Which sales rep has the highest close rate?",
        ],
    },
    CannedPlan {
        base_id: "netsuite",
        sql: "SELECT department, SUM(amount) AS total_amount, COUNT(*) AS transaction_count\nFROM `erp_poc.ns_gl_transactions`\nGROUP BY department ORDER BY total_amount DESC",
        explanation: "NetSuite GL analysis shows **Operations** has the highest spend at $320K with 120 transactions. **R&D** is second at $280K. All departments have budget remaining, with **R&D** having the most runway ($120K).",
        x_col: "department",
        y_col: "total_amount",
        followups: [
            "Show accounts payable aging report",
            "Which vendors have overdue invoices?",
            "Monthly revenue vs expense trend",
        ],
    },
    CannedPlan {
        base_id: "coupa",
        sql: "SELECT supplier, po_count, total_spend\nFROM `erp_poc.coupa_purchase_orders`\nGROUP BY supplier ORDER BY total_spend DESC",
        explanation: "Coupa procurement analysis: **Global Parts** is the top supplier at $520K across 45 POs. **CloudServ** follows at $310K. Average delivery ranges from 1-8 days, with **CloudServ** (cloud services) being fastest at 1 day.",
        x_col: "supplier",
        y_col: "total_spend",
        followups: [
            "Which suppliers have the fastest delivery times?",
            "Show procurement spend by category",
            "List POs pending approval over $50K",
        ],
    },
    CannedPlan {
        base_id: "workday",
        sql: "SELECT department, headcount, attrition_rate, avg_tenure_years\nFROM `erp_poc.wd_employees`\nGROUP BY department",
        explanation: "Workday headcount analysis: **Engineering** is the largest team (120 people). **Support** has the highest attrition at 15%, while **HR** has the lowest at 3%. Average tenure ranges from 2.5 to 5.0 years.",
        x_col: "department",
        y_col: "headcount",
        followups: [
            "Which departments need to hire most urgently?",
            "Show payroll cost breakdown by department",
            "What is the time-off utilization rate?",
        ],
    },
    CannedPlan {
        base_id: "jira",
        sql: "SELECT project, open_issues, completed_sprints, avg_velocity\nFROM `erp_poc.jira_sprints`\nGROUP BY project",
        explanation: "JIRA project overview: **Frontend** has the most open issues (55) but strong velocity. **DevOps** leads in sprint completion (15 sprints) with the highest velocity (40 pts). **Security** has the fewest open issues — good sign.",
        x_col: "project",
        y_col: "open_issues",
        followups: [
            "Which projects are behind schedule?",
            "Show sprint velocity trend for Platform team",
            "List critical/blocker issues across all projects",
        ],
    },
    CannedPlan {
        base_id: "inhouse",
        sql: "SELECT metric_name, current_value, target_value\nFROM `erp_poc.app_kpi_dashboard`\nORDER BY metric_name",
        explanation: "Internal KPI dashboard: **Uptime** is at 99.95% (target: 99.99%). **DAU** is 45K and trending up toward the 50K goal. **Error Rate** has improved to 0.3% from the 0.1% target. **NPS Score** is 72, showing good user satisfaction.",
        x_col: "metric_name",
        y_col: "current_value",
        followups: [
            "Show API latency trend over last 30 days",
            "Which endpoints have the highest error rate?",
            "Compare current metrics vs last quarter",
        ],
    },
];

/// Canned plan for a base id. Deterministic, no I/O.
pub fn offline_plan(base_id: &str) -> QueryPlan {
    let canned = CANNED_PLANS
        .iter()
        .find(|p| p.base_id == base_id)
        .unwrap_or(&CANNED_PLANS[0]);
    QueryPlan {
        sql: canned.sql.to_string(),
        explanation: canned.explanation.to_string(),
        chart_type: ChartType::Bar,
        x_col: canned.x_col.to_string(),
        y_col: canned.y_col.to_string(),
        followups: canned.followups.iter().map(|f| f.to_string()).collect(),
        error: None,
    }
}

/// Fixture table for a base id.
pub fn offline_table(base_id: &str) -> Result<DataFrame> {
    let df = match base_id {
        "netsuite" => df![
            "department" => ["Marketing", "Operations", "HR", "IT", "Finance", "R&D"],
            "total_amount" => [150000i64, 320000, 95000, 210000, 130000, 280000],
            "transaction_count" => [45i64, 120, 30, 80, 55, 95],
            "budget_remaining" => [50000i64, 30000, 25000, 90000, 70000, 120000]
        ]?,
        "coupa" => df![
            "supplier" => ["Acme Corp", "Global Parts", "TechVend", "Office Pro", "CloudServ", "DataFlow"],
            "po_count" => [28i64, 45, 15, 62, 20, 12],
            "total_spend" => [245000i64, 520000, 180000, 95000, 310000, 150000],
            "avg_delivery_days" => [5i64, 8, 3, 2, 1, 4]
        ]?,
        "workday" => df![
            "department" => ["Engineering", "Sales", "Marketing", "Support", "HR", "Finance"],
            "headcount" => [120i64, 85, 45, 60, 15, 25],
            "avg_tenure_years" => [3.2f64, 2.8, 4.1, 2.5, 5.0, 4.5],
            "attrition_rate" => [8.5f64, 12.0, 6.5, 15.0, 3.0, 5.0]
        ]?,
        "jira" => df![
            "project" => ["Platform", "Mobile App", "Data Pipeline", "DevOps", "Frontend", "Security"],
            "open_issues" => [45i64, 32, 18, 12, 55, 8],
            "completed_sprints" => [12i64, 10, 8, 15, 11, 6],
            "avg_velocity" => [28i64, 22, 35, 40, 25, 18]
        ]?,
        "inhouse" => df![
            "metric_name" => ["API Latency", "Uptime %", "DAU", "Error Rate", "Throughput", "NPS Score"],
            "current_value" => [125.0f64, 99.95, 45000.0, 0.3, 12000.0, 72.0],
            "target_value" => [100.0f64, 99.99, 50000.0, 0.1, 15000.0, 80.0],
            "trend" => ["↓ Improving", "→ Stable", "↑ Growing", "↓ Improving", "↑ Growing", "↑ Growing"]
        ]?,
        _ => df![
            "stage" => ["Prospecting", "Qualification", "Proposal", "Negotiation", "Closed Won", "Closed Lost"],
            "deal_count" => [45i64, 32, 28, 15, 22, 8],
            "total_value" => [890000i64, 1250000, 2100000, 1800000, 3200000, 450000],
            "avg_days_in_stage" => [12i64, 18, 25, 30, 5, 10]
        ]?,
    };
    Ok(df)
}
