//! Schema text used to ground SQL generation, one block per enterprise system.

use crate::sources::DEFAULT_SOURCE_ID;

/// Table templates. `{p}` and `{d}` are replaced with project and dataset.
const SCHEMAS: &[(&str, &str)] = &[
    (
        "salesforce",
        "
BigQuery Tables (source: Salesforce CRM → BigQuery via connector)

Table: `{p}.{d}.sf_opportunities`
  - opportunity_id STRING, name STRING, stage STRING
  - amount FLOAT64, close_date DATE, probability FLOAT64
  - account_id STRING, account_name STRING, owner STRING, region STRING

Table: `{p}.{d}.sf_leads`
  - lead_id STRING, name STRING, company STRING, status STRING
  - source STRING, created_date DATE, converted_date DATE

Table: `{p}.{d}.sf_cases`
  - case_id STRING, subject STRING, status STRING, priority STRING
  - account_id STRING, created_date DATE, closed_date DATE, resolution_time_hours FLOAT64
",
    ),
    (
        "netsuite",
        "
BigQuery Tables (source: NetSuite ERP → BigQuery via connector)

Table: `{p}.{d}.ns_gl_transactions`
  - transaction_id STRING, transaction_date DATE, period STRING
  - account_code STRING, account_name STRING, department STRING
  - amount FLOAT64, currency STRING, memo STRING

Table: `{p}.{d}.ns_accounts_payable`
  - invoice_id STRING, vendor STRING, invoice_date DATE, due_date DATE
  - amount FLOAT64, status STRING, payment_date DATE

Table: `{p}.{d}.ns_accounts_receivable`
  - invoice_id STRING, customer STRING, invoice_date DATE, due_date DATE
  - amount FLOAT64, status STRING, days_outstanding INT64
",
    ),
    (
        "coupa",
        "
BigQuery Tables (source: Coupa Procurement → BigQuery via connector)

Table: `{p}.{d}.coupa_purchase_orders`
  - po_id STRING, po_date DATE, supplier STRING, supplier_id STRING
  - category STRING, total_amount FLOAT64, status STRING
  - requester STRING, department STRING, delivery_date DATE

Table: `{p}.{d}.coupa_invoices`
  - invoice_id STRING, po_id STRING, supplier STRING
  - invoice_date DATE, amount FLOAT64, status STRING, payment_terms STRING
",
    ),
    (
        "workday",
        "
BigQuery Tables (source: Workday HCM → BigQuery via connector)

Table: `{p}.{d}.wd_employees`
  - employee_id STRING, name STRING, department STRING, title STRING
  - hire_date DATE, location STRING, manager STRING
  - salary FLOAT64, employment_type STRING, status STRING

Table: `{p}.{d}.wd_time_off`
  - request_id STRING, employee_id STRING, type STRING
  - start_date DATE, end_date DATE, days FLOAT64, status STRING

Table: `{p}.{d}.wd_payroll`
  - payroll_id STRING, employee_id STRING, period DATE
  - gross_pay FLOAT64, deductions FLOAT64, net_pay FLOAT64, department STRING
",
    ),
    (
        "jira",
        "
BigQuery Tables (source: JIRA → BigQuery via connector)

Table: `{p}.{d}.jira_issues`
  - issue_key STRING, summary STRING, issue_type STRING, status STRING
  - priority STRING, project STRING, assignee STRING, reporter STRING
  - created DATE, resolved DATE, story_points FLOAT64, sprint STRING

Table: `{p}.{d}.jira_sprints`
  - sprint_id STRING, name STRING, project STRING
  - start_date DATE, end_date DATE
  - committed_points FLOAT64, completed_points FLOAT64, velocity FLOAT64
",
    ),
    (
        "inhouse",
        "
BigQuery Tables (source: In-House Systems → BigQuery ETL)

Table: `{p}.{d}.app_product_metrics`
  - date DATE, metric_name STRING, metric_value FLOAT64
  - product STRING, environment STRING

Table: `{p}.{d}.app_api_logs`
  - timestamp TIMESTAMP, endpoint STRING, method STRING
  - response_code INT64, latency_ms FLOAT64, user_id STRING

Table: `{p}.{d}.app_kpi_dashboard`
  - date DATE, kpi_name STRING, current_value FLOAT64
  - target_value FLOAT64, department STRING, status STRING
",
    ),
];

const SOURCE_NAMES: &[(&str, &str)] = &[
    ("salesforce", "Salesforce CRM"),
    ("netsuite", "NetSuite ERP"),
    ("coupa", "Coupa Procurement"),
    ("workday", "Workday HCM"),
    ("jira", "JIRA Project Management"),
    ("inhouse", "In-House Systems"),
];

/// Pure schema lookup bound to one project/dataset pair.
#[derive(Debug, Clone)]
pub struct SchemaProvider {
    project: String,
    dataset: String,
}

impl SchemaProvider {
    pub fn new(project: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
        }
    }

    pub fn from_settings(settings: &crate::config::Settings) -> Self {
        Self::new(settings.project_or_placeholder(), settings.dataset.clone())
    }

    /// Table description for a base id. Unknown ids get the default source's schema.
    pub fn describe(&self, base_id: &str) -> String {
        let template = lookup(SCHEMAS, base_id)
            .or_else(|| lookup(SCHEMAS, DEFAULT_SOURCE_ID))
            .unwrap_or_default();
        template
            .replace("{p}", &self.project)
            .replace("{d}", &self.dataset)
    }

    pub fn source_name(&self, base_id: &str) -> String {
        lookup(SOURCE_NAMES, base_id)
            .map(str::to_string)
            .unwrap_or_else(|| base_id.to_string())
    }
}

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_qualifies_tables() {
        let provider = SchemaProvider::new("acme", "erp_poc");
        let schema = provider.describe("workday");
        assert!(schema.contains("`acme.erp_poc.wd_employees`"));
        assert!(!schema.contains("{p}"));
    }

    #[test]
    fn test_describe_is_stable_and_defaults() {
        let provider = SchemaProvider::new("YOUR_PROJECT", "erp_poc");
        assert_eq!(provider.describe("jira"), provider.describe("jira"));
        assert_eq!(provider.describe("oracle"), provider.describe("salesforce"));
    }

    #[test]
    fn test_source_name() {
        let provider = SchemaProvider::new("p", "d");
        assert_eq!(provider.source_name("coupa"), "Coupa Procurement");
        assert_eq!(provider.source_name("oracle"), "oracle");
    }
}
