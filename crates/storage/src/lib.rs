use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use meridian_core::{
    DeskError, Enquiry, EnquiryStatus, EnquiryWithLead, Lead, LeadSource, NewEnquiry, NewLead,
};
use parking_lot::RwLock;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

pub trait LeadRepository: Send + Sync {
    async fn create_lead(&self, lead: NewLead) -> Result<i64, DeskError>;
    async fn get_lead(&self, lead_id: i64) -> Result<Option<Lead>, DeskError>;
}

pub trait EnquiryRepository: Send + Sync {
    async fn create_enquiry(&self, lead_id: i64, enquiry: NewEnquiry) -> Result<i64, DeskError>;
    async fn get_enquiry(&self, enquiry_id: i64) -> Result<Option<Enquiry>, DeskError>;
    async fn list_enquiries(&self) -> Result<Vec<EnquiryWithLead>, DeskError>;
    async fn update_draft(
        &self,
        enquiry_id: i64,
        itinerary: &str,
        hotels: &str,
        price: &str,
        status: EnquiryStatus,
    ) -> Result<(), DeskError>;
}

#[derive(Debug)]
struct MissingRow(&'static str, i64);

impl std::fmt::Display for MissingRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} does not exist", self.0, self.1)
    }
}

impl std::error::Error for MissingRow {}

#[derive(Default)]
pub struct MemoryStore {
    next_id: AtomicI64,
    leads: Arc<RwLock<BTreeMap<i64, Lead>>>,
    enquiries: Arc<RwLock<BTreeMap<i64, Enquiry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl LeadRepository for MemoryStore {
    async fn create_lead(&self, lead: NewLead) -> Result<i64, DeskError> {
        let id = self.allocate_id();
        self.leads.write().insert(
            id,
            Lead {
                id,
                name: lead.name,
                phone: lead.phone,
                email: lead.email,
                source: lead.source,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn get_lead(&self, lead_id: i64) -> Result<Option<Lead>, DeskError> {
        Ok(self.leads.read().get(&lead_id).cloned())
    }
}

impl EnquiryRepository for MemoryStore {
    async fn create_enquiry(&self, lead_id: i64, enquiry: NewEnquiry) -> Result<i64, DeskError> {
        if !self.leads.read().contains_key(&lead_id) {
            return Err(DeskError::persistence(MissingRow("lead", lead_id)));
        }

        let id = self.allocate_id();
        self.enquiries.write().insert(
            id,
            Enquiry {
                id,
                lead_id,
                destination: enquiry.destination,
                travel_date: enquiry.travel_date,
                party_size: enquiry.party_size,
                budget: enquiry.budget,
                notes: enquiry.notes,
                status: EnquiryStatus::New,
                itinerary_text: String::new(),
                hotel_text: String::new(),
                price_text: String::new(),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn get_enquiry(&self, enquiry_id: i64) -> Result<Option<Enquiry>, DeskError> {
        Ok(self.enquiries.read().get(&enquiry_id).cloned())
    }

    async fn list_enquiries(&self) -> Result<Vec<EnquiryWithLead>, DeskError> {
        let leads = self.leads.read();
        let rows = self
            .enquiries
            .read()
            .values()
            .filter_map(|enquiry| {
                leads.get(&enquiry.lead_id).map(|lead| EnquiryWithLead {
                    enquiry: enquiry.clone(),
                    lead: lead.clone(),
                })
            })
            .collect();
        Ok(rows)
    }

    async fn update_draft(
        &self,
        enquiry_id: i64,
        itinerary: &str,
        hotels: &str,
        price: &str,
        status: EnquiryStatus,
    ) -> Result<(), DeskError> {
        let mut enquiries = self.enquiries.write();
        let Some(enquiry) = enquiries.get_mut(&enquiry_id) else {
            return Err(DeskError::persistence(MissingRow("enquiry", enquiry_id)));
        };

        enquiry.itinerary_text = itinerary.to_string();
        enquiry.hotel_text = hotels.to_string();
        enquiry.price_text = price.to_string();
        enquiry.status = status;
        Ok(())
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self, DeskError> {
        // One connection is the whole concurrency model: a single office
        // session writes at a time, and it keeps ":memory:" databases from
        // splitting across pooled connections.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(DeskError::persistence)?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<(), DeskError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS leads (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              name TEXT NOT NULL,
              phone TEXT NOT NULL DEFAULT '',
              email TEXT NOT NULL DEFAULT '',
              source TEXT,
              created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(DeskError::persistence)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS enquiries (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              lead_id INTEGER NOT NULL REFERENCES leads(id),
              destination TEXT NOT NULL,
              travel_date TEXT,
              party_size INTEGER,
              budget TEXT NOT NULL DEFAULT '',
              notes TEXT NOT NULL DEFAULT '',
              status TEXT NOT NULL,
              itinerary_text TEXT NOT NULL DEFAULT '',
              hotel_text TEXT NOT NULL DEFAULT '',
              price_text TEXT NOT NULL DEFAULT '',
              created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(DeskError::persistence)?;

        Ok(())
    }
}

fn lead_from_row(row: &sqlx::sqlite::SqliteRow) -> Lead {
    Lead {
        id: row.get("id"),
        name: row.get("name"),
        phone: row.get("phone"),
        email: row.get("email"),
        source: row
            .get::<Option<String>, _>("source")
            .as_deref()
            .and_then(LeadSource::parse),
        created_at: parse_timestamp(row.get::<String, _>("created_at")),
    }
}

fn enquiry_from_row(row: &sqlx::sqlite::SqliteRow) -> Enquiry {
    Enquiry {
        id: row.get("id"),
        lead_id: row.get("lead_id"),
        destination: row.get("destination"),
        travel_date: row
            .get::<Option<String>, _>("travel_date")
            .and_then(|value| value.parse().ok()),
        party_size: row.get("party_size"),
        budget: row.get("budget"),
        notes: row.get("notes"),
        status: EnquiryStatus::parse(row.get::<String, _>("status").as_str())
            .unwrap_or(EnquiryStatus::New),
        itinerary_text: row.get("itinerary_text"),
        hotel_text: row.get("hotel_text"),
        price_text: row.get("price_text"),
        created_at: parse_timestamp(row.get::<String, _>("created_at")),
    }
}

fn parse_timestamp(value: String) -> DateTime<Utc> {
    value.parse().unwrap_or_else(|_| Utc::now())
}

impl LeadRepository for SqliteStore {
    async fn create_lead(&self, lead: NewLead) -> Result<i64, DeskError> {
        let result = sqlx::query(
            r#"
            INSERT INTO leads (name, phone, email, source, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&lead.name)
        .bind(&lead.phone)
        .bind(&lead.email)
        .bind(lead.source.map(LeadSource::as_code))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(DeskError::persistence)?;

        Ok(result.last_insert_rowid())
    }

    async fn get_lead(&self, lead_id: i64) -> Result<Option<Lead>, DeskError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, phone, email, source, created_at
            FROM leads
            WHERE id = ?1
            "#,
        )
        .bind(lead_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DeskError::persistence)?;

        Ok(row.as_ref().map(lead_from_row))
    }
}

impl EnquiryRepository for SqliteStore {
    async fn create_enquiry(&self, lead_id: i64, enquiry: NewEnquiry) -> Result<i64, DeskError> {
        let result = sqlx::query(
            r#"
            INSERT INTO enquiries
              (lead_id, destination, travel_date, party_size, budget, notes,
               status, itinerary_text, hotel_text, price_text, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '', '', '', ?8)
            "#,
        )
        .bind(lead_id)
        .bind(&enquiry.destination)
        .bind(enquiry.travel_date.map(|date| date.to_string()))
        .bind(enquiry.party_size)
        .bind(&enquiry.budget)
        .bind(&enquiry.notes)
        .bind(EnquiryStatus::New.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(DeskError::persistence)?;

        Ok(result.last_insert_rowid())
    }

    async fn get_enquiry(&self, enquiry_id: i64) -> Result<Option<Enquiry>, DeskError> {
        let row = sqlx::query(
            r#"
            SELECT id, lead_id, destination, travel_date, party_size, budget, notes,
                   status, itinerary_text, hotel_text, price_text, created_at
            FROM enquiries
            WHERE id = ?1
            "#,
        )
        .bind(enquiry_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DeskError::persistence)?;

        Ok(row.as_ref().map(enquiry_from_row))
    }

    async fn list_enquiries(&self) -> Result<Vec<EnquiryWithLead>, DeskError> {
        let rows = sqlx::query(
            r#"
            SELECT e.id, e.lead_id, e.destination, e.travel_date, e.party_size,
                   e.budget, e.notes, e.status, e.itinerary_text, e.hotel_text,
                   e.price_text, e.created_at,
                   l.id AS l_id, l.name AS l_name, l.phone AS l_phone,
                   l.email AS l_email, l.source AS l_source,
                   l.created_at AS l_created_at
            FROM enquiries e
            JOIN leads l ON l.id = e.lead_id
            ORDER BY e.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DeskError::persistence)?;

        let items = rows
            .iter()
            .map(|row| EnquiryWithLead {
                enquiry: enquiry_from_row(row),
                lead: Lead {
                    id: row.get("l_id"),
                    name: row.get("l_name"),
                    phone: row.get("l_phone"),
                    email: row.get("l_email"),
                    source: row
                        .get::<Option<String>, _>("l_source")
                        .as_deref()
                        .and_then(LeadSource::parse),
                    created_at: parse_timestamp(row.get::<String, _>("l_created_at")),
                },
            })
            .collect();

        Ok(items)
    }

    async fn update_draft(
        &self,
        enquiry_id: i64,
        itinerary: &str,
        hotels: &str,
        price: &str,
        status: EnquiryStatus,
    ) -> Result<(), DeskError> {
        let result = sqlx::query(
            r#"
            UPDATE enquiries
            SET itinerary_text = ?2, hotel_text = ?3, price_text = ?4, status = ?5
            WHERE id = ?1
            "#,
        )
        .bind(enquiry_id)
        .bind(itinerary)
        .bind(hotels)
        .bind(price)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(DeskError::persistence)?;

        if result.rows_affected() == 0 {
            return Err(DeskError::persistence(MissingRow("enquiry", enquiry_id)));
        }

        Ok(())
    }
}

pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub async fn sqlite(database_url: &str) -> Result<Self, DeskError> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }
}

impl LeadRepository for Store {
    async fn create_lead(&self, lead: NewLead) -> Result<i64, DeskError> {
        match self {
            Store::Memory(store) => store.create_lead(lead).await,
            Store::Sqlite(store) => store.create_lead(lead).await,
        }
    }

    async fn get_lead(&self, lead_id: i64) -> Result<Option<Lead>, DeskError> {
        match self {
            Store::Memory(store) => store.get_lead(lead_id).await,
            Store::Sqlite(store) => store.get_lead(lead_id).await,
        }
    }
}

impl EnquiryRepository for Store {
    async fn create_enquiry(&self, lead_id: i64, enquiry: NewEnquiry) -> Result<i64, DeskError> {
        match self {
            Store::Memory(store) => store.create_enquiry(lead_id, enquiry).await,
            Store::Sqlite(store) => store.create_enquiry(lead_id, enquiry).await,
        }
    }

    async fn get_enquiry(&self, enquiry_id: i64) -> Result<Option<Enquiry>, DeskError> {
        match self {
            Store::Memory(store) => store.get_enquiry(enquiry_id).await,
            Store::Sqlite(store) => store.get_enquiry(enquiry_id).await,
        }
    }

    async fn list_enquiries(&self) -> Result<Vec<EnquiryWithLead>, DeskError> {
        match self {
            Store::Memory(store) => store.list_enquiries().await,
            Store::Sqlite(store) => store.list_enquiries().await,
        }
    }

    async fn update_draft(
        &self,
        enquiry_id: i64,
        itinerary: &str,
        hotels: &str,
        price: &str,
        status: EnquiryStatus,
    ) -> Result<(), DeskError> {
        match self {
            Store::Memory(store) => {
                store
                    .update_draft(enquiry_id, itinerary, hotels, price, status)
                    .await
            }
            Store::Sqlite(store) => {
                store
                    .update_draft(enquiry_id, itinerary, hotels, price, status)
                    .await
            }
        }
    }
}
