use sqlx::{PgPool, Postgres, Transaction};

use crate::clients::Client;
use crate::units::models::{
    FloorOccupancy, Unit, UnitPicture, UnitStats, UnitValues, DEFAULT_UNIT_STATUS, OCCUPIED_STATUS,
};

const UNIT_COLUMNS: &str = "id, unit_type, room_no, size, floor, price, installment_per_month, \
                            unit_status, created_at, updated_at";

/// Repository for units and their pictures
#[derive(Clone)]
pub struct UnitRepository {
    pool: PgPool,
}

impl UnitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All units, newest id first
    pub async fn list(&self) -> Result<Vec<Unit>, sqlx::Error> {
        sqlx::query_as::<_, Unit>(&format!(
            "SELECT {} FROM units ORDER BY id DESC",
            UNIT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Unit>, sqlx::Error> {
        sqlx::query_as::<_, Unit>(&format!("SELECT {} FROM units WHERE id = $1", UNIT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Pictures of every unit in `unit_ids`
    pub async fn pictures_for(&self, unit_ids: &[i32]) -> Result<Vec<UnitPicture>, sqlx::Error> {
        sqlx::query_as::<_, UnitPicture>(
            "SELECT id, unit_id, image_path FROM unit_pictures WHERE unit_id = ANY($1) ORDER BY id",
        )
        .bind(unit_ids)
        .fetch_all(&self.pool)
        .await
    }

    /// Clients attached to every unit in `unit_ids`
    pub async fn clients_for(&self, unit_ids: &[i32]) -> Result<Vec<Client>, sqlx::Error> {
        sqlx::query_as::<_, Client>(
            r#"
            SELECT id, first_name, last_name, email, broker_id, unit_id, created_at
            FROM clients
            WHERE unit_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(unit_ids)
        .fetch_all(&self.pool)
        .await
    }

    /// Insert a unit and its pictures in one transaction
    pub async fn create(
        &self,
        values: &UnitValues,
        image_paths: &[String],
    ) -> Result<(Unit, Vec<UnitPicture>), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let unit = sqlx::query_as::<_, Unit>(&format!(
            r#"
            INSERT INTO units (unit_type, room_no, size, floor, price, installment_per_month, unit_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            UNIT_COLUMNS
        ))
        .bind(&values.unit_type)
        .bind(&values.room_no)
        .bind(&values.size)
        .bind(values.floor)
        .bind(values.price)
        .bind(values.installment_per_month)
        .bind(&values.unit_status)
        .fetch_one(&mut *tx)
        .await?;

        let pictures = insert_pictures(&mut tx, unit.id, image_paths).await?;

        tx.commit().await?;
        Ok((unit, pictures))
    }

    /// Update a unit in one transaction.
    ///
    /// `merge` computes the new column values from the locked row. Pictures in
    /// `deleted_picture_ids` that belong to the unit are removed and returned
    /// so the caller can delete their files once the commit succeeded.
    /// Returns `None` when the unit does not exist.
    pub async fn update<F, E>(
        &self,
        id: i32,
        merge: F,
        image_paths: &[String],
        deleted_picture_ids: &[i32],
    ) -> Result<Option<(Unit, Vec<UnitPicture>)>, E>
    where
        F: FnOnce(&Unit) -> Result<UnitValues, E>,
        E: From<sqlx::Error>,
    {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Unit>(&format!(
            "SELECT {} FROM units WHERE id = $1 FOR UPDATE",
            UNIT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(existing) = existing else {
            return Ok(None);
        };
        let values = merge(&existing)?;

        let removed = if deleted_picture_ids.is_empty() {
            Vec::new()
        } else {
            sqlx::query_as::<_, UnitPicture>(
                r#"
                DELETE FROM unit_pictures
                WHERE unit_id = $1 AND id = ANY($2)
                RETURNING id, unit_id, image_path
                "#,
            )
            .bind(id)
            .bind(deleted_picture_ids)
            .fetch_all(&mut *tx)
            .await?
        };

        let unit = sqlx::query_as::<_, Unit>(&format!(
            r#"
            UPDATE units
            SET unit_type = $2, room_no = $3, size = $4, floor = $5, price = $6,
                installment_per_month = $7, unit_status = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            UNIT_COLUMNS
        ))
        .bind(id)
        .bind(&values.unit_type)
        .bind(&values.room_no)
        .bind(&values.size)
        .bind(values.floor)
        .bind(values.price)
        .bind(values.installment_per_month)
        .bind(&values.unit_status)
        .fetch_one(&mut *tx)
        .await?;

        insert_pictures(&mut tx, id, image_paths).await?;

        tx.commit().await?;
        Ok(Some((unit, removed)))
    }

    /// Delete a unit; its picture rows cascade and are returned.
    /// Returns `None` when the unit does not exist.
    pub async fn delete(&self, id: i32) -> Result<Option<Vec<UnitPicture>>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let pictures = sqlx::query_as::<_, UnitPicture>(
            "SELECT id, unit_id, image_path FROM unit_pictures WHERE unit_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM units WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(pictures))
    }

    /// Occupancy counts computed in SQL
    pub async fn stats(&self) -> Result<UnitStats, sqlx::Error> {
        let (total, occupied, available): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE LOWER(unit_status) = $1),
                   COUNT(*) FILTER (WHERE LOWER(unit_status) = $2)
            FROM units
            "#,
        )
        .bind(OCCUPIED_STATUS)
        .bind(DEFAULT_UNIT_STATUS)
        .fetch_one(&self.pool)
        .await?;

        let occupied_by_floor = sqlx::query_as::<_, FloorOccupancy>(
            r#"
            SELECT floor, COUNT(*) AS occupied
            FROM units
            WHERE LOWER(unit_status) = $1
            GROUP BY floor
            ORDER BY floor NULLS LAST
            "#,
        )
        .bind(OCCUPIED_STATUS)
        .fetch_all(&self.pool)
        .await?;

        Ok(UnitStats {
            total,
            occupied,
            available,
            occupied_by_floor,
        })
    }
}

async fn insert_pictures(
    tx: &mut Transaction<'_, Postgres>,
    unit_id: i32,
    image_paths: &[String],
) -> Result<Vec<UnitPicture>, sqlx::Error> {
    let mut pictures = Vec::with_capacity(image_paths.len());
    for path in image_paths {
        let picture = sqlx::query_as::<_, UnitPicture>(
            r#"
            INSERT INTO unit_pictures (unit_id, image_path)
            VALUES ($1, $2)
            RETURNING id, unit_id, image_path
            "#,
        )
        .bind(unit_id)
        .bind(path)
        .fetch_one(&mut **tx)
        .await?;
        pictures.push(picture);
    }
    Ok(pictures)
}
