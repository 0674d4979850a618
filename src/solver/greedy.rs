use crate::deal::{Deal, TOTAL_TABLEAUS};
use crate::moves::{Move, Origin};

const GREEDY_MAX_PASSES: u32 = 12;

/// Cheap non-branching playability check: repeatedly send any eligible top
/// card home (tableau tops first, then the waste top), draw when stuck, and
/// recycle the waste as long as the previous pass made progress. No
/// backtracking and no alternatives are ever considered, so `true` proves the
/// deal autoplays while `false` only proves this greedy policy fails.
pub fn is_greedy_solvable(deal: &Deal) -> bool {
    let mut deal = deal.clone();
    let mut passes = 0;
    let mut progressed = true;
    loop {
        if deal.is_won() {
            return true;
        }
        if let Some(mov) = safe_foundation_move(&deal) {
            mov.apply(&mut deal);
            progressed = true;
        } else if !deal.stock.is_empty() {
            Move::StockDraw.apply(&mut deal);
        } else if !deal.waste.is_empty() && progressed && passes < GREEDY_MAX_PASSES {
            Move::RecycleWaste.apply(&mut deal);
            passes += 1;
            progressed = false;
        } else {
            return false;
        }
    }
}

fn safe_foundation_move(deal: &Deal) -> Option<Move> {
    for i in 0..TOTAL_TABLEAUS {
        if let Some(card) = deal.tableaus[i].last()
            && card.face_up
            && deal.can_add_to_foundation(*card)
        {
            return Some(Move::Foundation {
                from: Origin::Tableau(i),
            });
        }
    }
    match deal.waste.last() {
        Some(card) if deal.can_add_to_foundation(*card) => {
            Some(Move::Foundation { from: Origin::Waste })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autoplayable_deal() {
        const DEAL_STR: &str = r#"Stock: K♣Q♣
Foundation1: J♣
Foundation2: K♦
Foundation3: K♠
Foundation4: K♥
DrawCount: 1"#;
        let deal = Deal::parse(DEAL_STR).unwrap();
        assert!(deal.is_valid());
        assert!(is_greedy_solvable(&deal));
    }

    #[test]
    fn test_recycle_reaches_buried_waste_card() {
        // K♣ sits on top of the waste and is not yet playable; Q♣ only
        // surfaces after a recycle turns the waste back into the stock.
        const DEAL_STR: &str = r#"Waste: Q♣K♣
Foundation1: J♣
Foundation2: K♦
Foundation3: K♠
Foundation4: K♥
DrawCount: 1"#;
        let deal = Deal::parse(DEAL_STR).unwrap();
        assert!(is_greedy_solvable(&deal));
    }

    #[test]
    fn test_stuck_deal_fails_fast() {
        const DEAL_STR: &str = r#"Tableau1: A♣|5♦
Tableau2: |K♣
DrawCount: 1"#;
        let deal = Deal::parse(DEAL_STR).unwrap();
        assert!(!is_greedy_solvable(&deal));
    }
}
