use std::collections::HashMap;

use sqlx::PgPool;

use crate::brokers::models::{
    Broker, BrokerChanges, BrokerPicture, BrokerRelations, CharacterReference,
    EducationBackground, NewBroker, SalesExperience, Seminar,
};

const BROKER_COLUMNS: &str = "id, first_name, middle_name, last_name, birth_date, home_address, \
    email, employer_name, position, business_address, brokers_license, tin, primary_contact, \
    viber, whatsapp, messenger, emergency_contact_name, emergency_contact_no, \
    emergency_relationship, created_at, updated_at";

/// Repository for brokers and their nested records
#[derive(Clone)]
pub struct BrokerRepository {
    pool: PgPool,
}

impl BrokerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a broker with every nested record in one transaction.
    /// Returns the new broker id.
    pub async fn create(
        &self,
        broker: &NewBroker,
        picture_path: Option<&str>,
    ) -> Result<i32, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let (broker_id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO brokers (
                first_name, middle_name, last_name, birth_date, home_address, email,
                password_hash, employer_name, position, business_address, brokers_license,
                tin, primary_contact, viber, whatsapp, messenger, emergency_contact_name,
                emergency_contact_no, emergency_relationship
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING id
            "#,
        )
        .bind(&broker.first_name)
        .bind(&broker.middle_name)
        .bind(&broker.last_name)
        .bind(&broker.birth_date)
        .bind(&broker.home_address)
        .bind(&broker.email)
        .bind(&broker.password_hash)
        .bind(&broker.employer_name)
        .bind(&broker.position)
        .bind(&broker.business_address)
        .bind(&broker.brokers_license)
        .bind(&broker.tin)
        .bind(&broker.primary_contact)
        .bind(&broker.viber)
        .bind(&broker.whatsapp)
        .bind(&broker.messenger)
        .bind(&broker.emergency_contact_name)
        .bind(&broker.emergency_contact_no)
        .bind(&broker.emergency_relationship)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(path) = picture_path {
            sqlx::query("INSERT INTO broker_pictures (broker_id, image_path) VALUES ($1, $2)")
                .bind(broker_id)
                .bind(path)
                .execute(&mut *tx)
                .await?;
        }

        for reference in &broker.character_references {
            sqlx::query(
                r#"
                INSERT INTO character_references (broker_id, name, relationship, contact_no, email)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(broker_id)
            .bind(&reference.name)
            .bind(&reference.relationship)
            .bind(&reference.contact_no)
            .bind(&reference.email)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(education) = &broker.education {
            sqlx::query(
                r#"
                INSERT INTO education_backgrounds (broker_id, high_school, high_school_year, college, college_year)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(broker_id)
            .bind(&education.high_school)
            .bind(&education.high_school_year)
            .bind(&education.college)
            .bind(&education.college_year)
            .execute(&mut *tx)
            .await?;
        }

        for seminar in &broker.seminars {
            sqlx::query("INSERT INTO seminars (broker_id, title, date, venue) VALUES ($1, $2, $3, $4)")
                .bind(broker_id)
                .bind(&seminar.title)
                .bind(&seminar.date)
                .bind(&seminar.venue)
                .execute(&mut *tx)
                .await?;
        }

        for experience in &broker.sales_experiences {
            sqlx::query(
                "INSERT INTO sales_experiences (broker_id, company, position, years) VALUES ($1, $2, $3, $4)",
            )
            .bind(broker_id)
            .bind(&experience.company)
            .bind(&experience.position)
            .bind(&experience.years)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(broker_id)
    }

    /// Update a broker's profile in one transaction.
    ///
    /// `changes` computes the new column values from the locked row. When
    /// `picture_path` is set it replaces every stored picture, and the
    /// replaced rows are returned so the caller can delete their files after
    /// the commit. Returns `None` when the broker does not exist.
    pub async fn update<F>(
        &self,
        id: i32,
        changes: F,
        picture_path: Option<&str>,
    ) -> Result<Option<Vec<BrokerPicture>>, sqlx::Error>
    where
        F: FnOnce(&Broker) -> BrokerChanges,
    {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Broker>(&format!(
            "SELECT {} FROM brokers WHERE id = $1 FOR UPDATE",
            BROKER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(existing) = existing else {
            return Ok(None);
        };
        let changes = changes(&existing);

        sqlx::query(
            r#"
            UPDATE brokers
            SET first_name = $2, last_name = $3, email = $4, primary_contact = $5,
                brokers_license = $6, employer_name = $7, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.email)
        .bind(&changes.primary_contact)
        .bind(&changes.brokers_license)
        .bind(&changes.employer_name)
        .execute(&mut *tx)
        .await?;

        let replaced = match picture_path {
            Some(path) => {
                let replaced = sqlx::query_as::<_, BrokerPicture>(
                    "DELETE FROM broker_pictures WHERE broker_id = $1 RETURNING id, broker_id, image_path",
                )
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

                sqlx::query("INSERT INTO broker_pictures (broker_id, image_path) VALUES ($1, $2)")
                    .bind(id)
                    .bind(path)
                    .execute(&mut *tx)
                    .await?;
                replaced
            }
            None => Vec::new(),
        };

        tx.commit().await?;
        Ok(Some(replaced))
    }

    /// All brokers, newest id first
    pub async fn list(&self) -> Result<Vec<Broker>, sqlx::Error> {
        sqlx::query_as::<_, Broker>(&format!(
            "SELECT {} FROM brokers ORDER BY id DESC",
            BROKER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Broker>, sqlx::Error> {
        sqlx::query_as::<_, Broker>(&format!("SELECT {} FROM brokers WHERE id = $1", BROKER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Nested records and client counts for every broker in `ids`
    pub async fn relations_for(
        &self,
        ids: &[i32],
    ) -> Result<HashMap<i32, BrokerRelations>, sqlx::Error> {
        let mut relations: HashMap<i32, BrokerRelations> = HashMap::new();

        let pictures = sqlx::query_as::<_, BrokerPicture>(
            "SELECT id, broker_id, image_path FROM broker_pictures WHERE broker_id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        for row in pictures {
            relations.entry(row.broker_id).or_default().broker_pictures.push(row);
        }

        let references = sqlx::query_as::<_, CharacterReference>(
            r#"
            SELECT id, broker_id, name, relationship, contact_no, email
            FROM character_references WHERE broker_id = ANY($1) ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        for row in references {
            relations.entry(row.broker_id).or_default().character_references.push(row);
        }

        let education = sqlx::query_as::<_, EducationBackground>(
            r#"
            SELECT id, broker_id, high_school, high_school_year, college, college_year
            FROM education_backgrounds WHERE broker_id = ANY($1) ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        for row in education {
            relations.entry(row.broker_id).or_default().educ_backgrounds.push(row);
        }

        let seminars = sqlx::query_as::<_, Seminar>(
            "SELECT id, broker_id, title, date, venue FROM seminars WHERE broker_id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        for row in seminars {
            relations.entry(row.broker_id).or_default().seminars.push(row);
        }

        let experiences = sqlx::query_as::<_, SalesExperience>(
            r#"
            SELECT id, broker_id, company, position, years
            FROM sales_experiences WHERE broker_id = ANY($1) ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        for row in experiences {
            relations.entry(row.broker_id).or_default().sales_experiences.push(row);
        }

        let counts: Vec<(i32, i64)> = sqlx::query_as(
            r#"
            SELECT broker_id, COUNT(*)
            FROM clients
            WHERE broker_id = ANY($1)
            GROUP BY broker_id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        for (broker_id, count) in counts {
            relations.entry(broker_id).or_default().client_count = count;
        }

        Ok(relations)
    }
}
