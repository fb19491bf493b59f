//! Card reference data and drawn-card persistence

use rand::seq::SliceRandom;
use rand::Rng;
use sqlx::{Row, SqlitePool};
use taro_common::{Error, Result};

use crate::models::{Card, DrawnCard, DrawnCardDetail, Orientation};

/// Major arcana deck seeded at startup
const DECK: &[(i64, &str, &str, &str)] = &[
    (1, "The Fool", "new beginnings, spontaneity, a leap of faith", "recklessness, hesitation, a risk taken blindly"),
    (2, "The Magician", "willpower, resourcefulness, manifestation", "manipulation, scattered energy, untapped talent"),
    (3, "The High Priestess", "intuition, inner wisdom, the unseen", "secrets withheld, a silenced inner voice"),
    (4, "The Empress", "abundance, nurturing, creative growth", "dependence, creative block, smothering care"),
    (5, "The Emperor", "structure, authority, steady foundations", "rigidity, domination, loss of control"),
    (6, "The Hierophant", "tradition, guidance, shared beliefs", "rebellion, dogma questioned, restriction"),
    (7, "The Lovers", "union, alignment of values, a heartfelt choice", "disharmony, imbalance, a choice avoided"),
    (8, "The Chariot", "determination, victory through focus", "lost direction, aggression, stalled momentum"),
    (9, "Strength", "quiet courage, compassion, inner resolve", "self-doubt, raw emotion, depleted will"),
    (10, "The Hermit", "reflection, solitude, inner guidance", "isolation, withdrawal, loneliness"),
    (11, "Wheel of Fortune", "turning points, cycles, good luck arriving", "resistance to change, a cycle repeating"),
    (12, "Justice", "fairness, truth, consequences honored", "imbalance, avoidance of accountability"),
    (13, "The Hanged Man", "surrender, a new perspective, pause", "stalling, needless sacrifice, fear of release"),
    (14, "Death", "endings that clear the way, transformation", "clinging to the past, a transition resisted"),
    (15, "Temperance", "balance, patience, finding the middle path", "excess, impatience, competing pulls"),
    (16, "The Devil", "attachment, temptation, bonds that bind", "release from limits, reclaiming power"),
    (17, "The Tower", "sudden upheaval, revelation, broken illusions", "disaster narrowly averted, fear of change"),
    (18, "The Star", "hope, renewal, quiet confidence", "discouragement, faith tested, dimmed optimism"),
    (19, "The Moon", "uncertainty, dreams, the intuitive dark", "confusion lifting, fears seen for what they are"),
    (20, "The Sun", "joy, vitality, plain good fortune", "clouded happiness, delayed success"),
    (21, "Judgement", "awakening, renewal, an honest reckoning", "self-criticism, a call ignored"),
    (22, "The World", "completion, wholeness, a journey fulfilled", "loose ends, a goal just out of reach"),
];

/// Seed the card definitions if the table is empty
pub async fn seed_deck(pool: &SqlitePool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cards")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    for (id, name, upright, reversed) in DECK {
        sqlx::query(
            "INSERT INTO cards (id, name, meaning_upright, meaning_reversed) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(upright)
        .bind(reversed)
        .execute(pool)
        .await?;
    }

    tracing::info!(cards = DECK.len(), "Card deck seeded");
    Ok(())
}

/// Look a card definition up by name (seed data helper, used by tests)
pub async fn find_card_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Card>> {
    let card = sqlx::query_as::<_, Card>(
        "SELECT id, name, meaning_upright, meaning_reversed FROM cards WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(card)
}

/// Persist one drawn card
pub async fn save_drawn_card(pool: &SqlitePool, drawn: &DrawnCard) -> Result<()> {
    sqlx::query(
        "INSERT INTO drawn_cards (reading_id, position, card_id, orientation)
         VALUES (?, ?, ?, ?)",
    )
    .bind(drawn.reading_id)
    .bind(drawn.position as i64)
    .bind(drawn.card_id)
    .bind(drawn.orientation.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

/// Draw three distinct cards with random orientations for a reading
pub async fn draw_cards(pool: &SqlitePool, reading_id: i64) -> Result<Vec<DrawnCard>> {
    let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM cards")
        .fetch_all(pool)
        .await?;
    if ids.len() < 3 {
        return Err(Error::Internal("Not enough cards in database".to_string()));
    }

    let picked: Vec<i64> = {
        let mut rng = rand::thread_rng();
        let mut picked = ids.choose_multiple(&mut rng, 3).copied().collect::<Vec<_>>();
        picked.shuffle(&mut rng);
        picked
    };

    let mut drawn = Vec::with_capacity(3);
    for (idx, card_id) in picked.into_iter().enumerate() {
        let orientation = if rand::thread_rng().gen_bool(0.5) {
            Orientation::Upright
        } else {
            Orientation::Reversed
        };
        let card = DrawnCard {
            reading_id,
            position: idx as u8 + 1,
            card_id,
            orientation,
        };
        save_drawn_card(pool, &card).await?;
        drawn.push(card);
    }

    Ok(drawn)
}

/// Drawn cards for a reading, ordered by position, joined with definitions
pub async fn list_by_reading(pool: &SqlitePool, reading_id: i64) -> Result<Vec<DrawnCardDetail>> {
    let rows = sqlx::query(
        r#"
        SELECT d.position, d.orientation,
               c.id, c.name, c.meaning_upright, c.meaning_reversed
        FROM drawn_cards d
        JOIN cards c ON c.id = d.card_id
        WHERE d.reading_id = ?
        ORDER BY d.position
        "#,
    )
    .bind(reading_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let orientation: String = row.get("orientation");
            let orientation = match orientation.as_str() {
                "upright" => Orientation::Upright,
                "reversed" => Orientation::Reversed,
                other => {
                    return Err(Error::Internal(format!("Unknown orientation: {}", other)));
                }
            };
            Ok(DrawnCardDetail {
                position: row.get::<i64, _>("position") as u8,
                orientation,
                card: Card {
                    id: row.get("id"),
                    name: row.get("name"),
                    meaning_upright: row.get("meaning_upright"),
                    meaning_reversed: row.get("meaning_reversed"),
                },
            })
        })
        .collect()
}
