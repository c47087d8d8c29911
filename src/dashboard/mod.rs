//! Single-page summary of both tables.
//!
//! Every page load resolves configuration, opens a session, runs the two
//! fixed queries and releases the session again. Failures become a page
//! state instead of an error.

pub mod charts;
pub mod page;
pub mod server;

use crate::config::WarehouseTarget;
use crate::domain::{FinancialAssistanceRecord, TourismRecord};
use crate::error::Result;
use crate::warehouse::{release, Connector, Session};
use tracing::{error, info, warn};

pub const TOURISM_QUERY: &str = "SELECT STATE, DOMESTIC_TOURIST_VISITS_MILLION, FOREIGN_TOURIST_VISITS_MILLION, \
     HAS_ART, HAS_CULTURE, HAS_TOURISM \
     FROM TOURISM_DATA \
     ORDER BY DOMESTIC_TOURIST_VISITS_MILLION DESC NULLS LAST";

pub const FINANCIAL_QUERY: &str = "SELECT STATE_UT, FINANCIAL_YEAR, NO_OF_ORGS, AMOUNT_RS_IN_LAKHS \
     FROM ART_CULTURE_FINANCIAL_DATA \
     ORDER BY FINANCIAL_YEAR DESC, AMOUNT_RS_IN_LAKHS DESC";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardData {
    pub financial: Vec<FinancialAssistanceRecord>,
    pub tourism: Vec<TourismRecord>,
}

/// What the page shows.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    Ready(DashboardData),
    ConfigurationError(String),
    ConnectionError(String),
}

/// Run both dashboard queries on an open session.
pub async fn fetch(session: &dyn Session) -> Result<DashboardData> {
    let tourism = session
        .query(TOURISM_QUERY, &[])
        .await?
        .iter()
        .map(TourismRecord::from_row)
        .collect::<Result<Vec<_>>>()?;
    let financial = session
        .query(FINANCIAL_QUERY, &[])
        .await?
        .iter()
        .map(FinancialAssistanceRecord::from_row)
        .collect::<Result<Vec<_>>>()?;
    Ok(DashboardData { financial, tourism })
}

/// Resolve configuration from `lookup`, connect and fetch.
///
/// No connection is attempted when configuration is incomplete.
pub async fn load_dashboard<F>(lookup: F, connector: &dyn Connector) -> DashboardView
where
    F: Fn(&str) -> Option<String>,
{
    let target = match WarehouseTarget::from_lookup(lookup) {
        Ok(target) => target,
        Err(e) => {
            warn!("Dashboard configuration incomplete: {}", e);
            return DashboardView::ConfigurationError(e.to_string());
        }
    };

    let session = match connector.connect(&target).await {
        Ok(session) => session,
        Err(e) if e.is_configuration() => return DashboardView::ConfigurationError(e.to_string()),
        Err(e) => {
            error!("Error connecting to warehouse: {}", e);
            return DashboardView::ConnectionError(e.to_string());
        }
    };

    let result = fetch(session.as_ref()).await;
    release(session).await;

    match result {
        Ok(data) => {
            info!(
                "Dashboard loaded {} financial and {} tourism rows",
                data.financial.len(),
                data.tourism.len()
            );
            DashboardView::Ready(data)
        }
        Err(e) => {
            error!("Error loading dashboard data: {}", e);
            DashboardView::ConnectionError(e.to_string())
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::CountingConnector;
    use super::*;
    use crate::config::REQUIRED_VARS;

    #[tokio::test]
    async fn test_missing_config_names_every_variable_without_connecting() {
        let connector = CountingConnector::default();
        let view = load_dashboard(|_| None, &connector).await;

        match view {
            DashboardView::ConfigurationError(message) => {
                for var in REQUIRED_VARS {
                    assert!(message.contains(var), "{message} should name {var}");
                }
            }
            other => panic!("unexpected view: {other:?}"),
        }
        assert_eq!(connector.calls(), 0);
    }

    #[tokio::test]
    async fn test_connection_failure_is_a_connection_error_state() {
        let connector = CountingConnector::default();
        let view = load_dashboard(
            |key| REQUIRED_VARS.contains(&key).then(|| "value".to_string()),
            &connector,
        )
        .await;

        assert!(matches!(view, DashboardView::ConnectionError(ref m) if m.contains("Incorrect username")));
        assert_eq!(connector.calls(), 1);
    }

    mod session_release {
        use crate::config::{WarehouseTarget, REQUIRED_VARS};
        use crate::dashboard::{load_dashboard, DashboardView};
        use crate::error::{Result, WarehouseError};
        use crate::warehouse::{Connector, Dialect, Row, Session, SqlValue};
        use async_trait::async_trait;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        /// Sessions whose queries fail; counts how many were closed.
        #[derive(Default)]
        struct BrokenQueries {
            closed: Arc<AtomicUsize>,
        }

        struct BrokenSession {
            closed: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl Session for BrokenSession {
            fn dialect(&self) -> Dialect {
                Dialect::Snowflake
            }

            async fn execute(&self, _sql: &str, _params: &[SqlValue]) -> Result<u64> {
                Ok(0)
            }

            async fn query(&self, _sql: &str, _params: &[SqlValue]) -> Result<Vec<Row>> {
                Err(WarehouseError::Query("Object 'TOURISM_DATA' does not exist".to_string()))
            }

            async fn close(&self) -> Result<()> {
                self.closed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        #[async_trait]
        impl Connector for BrokenQueries {
            async fn connect(&self, _target: &WarehouseTarget) -> Result<Box<dyn Session>> {
                Ok(Box::new(BrokenSession { closed: self.closed.clone() }))
            }
        }

        #[tokio::test]
        async fn test_session_released_when_queries_fail() {
            let connector = BrokenQueries::default();
            let view = load_dashboard(
                |key| REQUIRED_VARS.contains(&key).then(|| "value".to_string()),
                &connector,
            )
            .await;

            assert!(matches!(view, DashboardView::ConnectionError(ref m) if m.contains("does not exist")));
            assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
        }
    }
}
