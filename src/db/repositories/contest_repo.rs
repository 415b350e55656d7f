//! Contest repository
//!
//! SQL is assembled as a [`Statement`] (text plus positional parameters) before
//! it touches a connection. User-supplied values only ever travel as bound
//! parameters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Arguments, PgPool, postgres::PgArguments};

use crate::models::{Contest, ContestFilter, NewContest};

/// Columns of a contest row, aliased to the API field names
const CONTEST_COLUMNS: &str = r#"id, sport, entry_fee AS "entryFee", prize_pool AS "prizePool", participants, starts_at AS "startsAt", max_players AS "maxPlayers""#;

/// A value bound to a positional SQL parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Float(f64),
    BigInt(i64),
    Int(i32),
    Timestamp(DateTime<Utc>),
}

/// SQL text together with its parameters, in `$n` order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl Statement {
    fn arguments(&self) -> Result<PgArguments, sqlx::Error> {
        let mut args = PgArguments::default();
        for param in &self.params {
            let added = match param {
                SqlParam::Text(v) => args.add(v.clone()),
                SqlParam::Float(v) => args.add(*v),
                SqlParam::BigInt(v) => args.add(*v),
                SqlParam::Int(v) => args.add(*v),
                SqlParam::Timestamp(v) => args.add(*v),
            };
            added.map_err(sqlx::Error::Encode)?;
        }
        Ok(args)
    }
}

/// Persistence operations the contest handlers depend on
#[async_trait]
pub trait ContestStore: Send + Sync {
    /// Insert one contest and return the stored row
    async fn insert(&self, contest: &NewContest) -> Result<Contest, sqlx::Error>;

    /// Fetch one page of contests together with the total matching count
    async fn list(&self, filter: &ContestFilter) -> Result<(Vec<Contest>, i64), sqlx::Error>;
}

/// Repository for contest database operations
#[derive(Clone)]
pub struct ContestRepository {
    pool: PgPool,
}

impl ContestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// WHERE clause for a filter; predicates are always appended sport, minFee, maxFee
    fn filter_clause(filter: &ContestFilter) -> (String, Vec<SqlParam>) {
        let mut predicates = Vec::new();
        let mut params = Vec::new();

        if let Some(sport) = &filter.sport {
            params.push(SqlParam::Text(sport.clone()));
            predicates.push(format!("sport = ${}", params.len()));
        }
        if let Some(min_fee) = filter.min_fee {
            params.push(SqlParam::Float(min_fee));
            predicates.push(format!("entry_fee >= ${}", params.len()));
        }
        if let Some(max_fee) = filter.max_fee {
            params.push(SqlParam::Float(max_fee));
            predicates.push(format!("entry_fee <= ${}", params.len()));
        }

        if predicates.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", predicates.join(" AND ")), params)
        }
    }

    /// `SELECT COUNT(*)` over every contest matching the filter
    pub fn count_statement(filter: &ContestFilter) -> Statement {
        let (clause, params) = Self::filter_clause(filter);
        Statement {
            sql: format!("SELECT COUNT(*) FROM contests{}", clause),
            params,
        }
    }

    /// One page of matching contests, newest start time first
    pub fn page_statement(filter: &ContestFilter) -> Statement {
        let (clause, mut params) = Self::filter_clause(filter);
        let limit_pos = params.len() + 1;
        let offset_pos = params.len() + 2;
        params.push(SqlParam::BigInt(filter.limit));
        params.push(SqlParam::BigInt(filter.offset()));

        Statement {
            sql: format!(
                "SELECT {} FROM contests{} ORDER BY starts_at DESC, id DESC LIMIT ${} OFFSET ${}",
                CONTEST_COLUMNS, clause, limit_pos, offset_pos
            ),
            params,
        }
    }

    /// Single-row insert returning the stored contest
    pub fn insert_statement(contest: &NewContest) -> Statement {
        Statement {
            sql: format!(
                "INSERT INTO contests (sport, entry_fee, starts_at, max_players) \
                 VALUES ($1, $2, $3, $4) RETURNING {}",
                CONTEST_COLUMNS
            ),
            params: vec![
                SqlParam::Text(contest.sport.clone()),
                SqlParam::Float(contest.entry_fee),
                SqlParam::Timestamp(contest.starts_at),
                SqlParam::Int(contest.max_players),
            ],
        }
    }
}

#[async_trait]
impl ContestStore for ContestRepository {
    async fn insert(&self, contest: &NewContest) -> Result<Contest, sqlx::Error> {
        let statement = Self::insert_statement(contest);

        // Returned to the pool when dropped, on every exit path
        let mut conn = self.pool.acquire().await?;

        let row = sqlx::query_as_with::<_, Contest, _>(&statement.sql, statement.arguments()?)
            .fetch_one(&mut *conn)
            .await?;

        Ok(row)
    }

    async fn list(&self, filter: &ContestFilter) -> Result<(Vec<Contest>, i64), sqlx::Error> {
        let count = Self::count_statement(filter);
        let page = Self::page_statement(filter);

        let mut conn = self.pool.acquire().await?;

        let total: i64 = sqlx::query_scalar_with(&count.sql, count.arguments()?)
            .fetch_one(&mut *conn)
            .await?;

        let contests = sqlx::query_as_with::<_, Contest, _>(&page.sql, page.arguments()?)
            .fetch_all(&mut *conn)
            .await?;

        Ok((contests, total))
    }
}
