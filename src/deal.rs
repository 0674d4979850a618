use anyhow::{Context, Result};
use smallvec::SmallVec;

pub const TOTAL_FOUNDATIONS: usize = 4;
pub const TOTAL_TABLEAUS: usize = 7;
pub const TOTAL_CARDS: usize = 52;
pub const TABLEAU_CARDS: usize = 28;
pub const TALON_SIZE: usize = 24;
pub const MAX_RANK: u8 = 13;
pub const MAX_SUIT: u8 = 4;

const SUITS: [char; 4] = ['♣', '♦', '♠', '♥'];
const RANKS: [char; 13] = [
    'A', '2', '3', '4', '5', '6', '7', '8', '9', 'T', 'J', 'Q', 'K',
];
const TABLEAU_SIZE: usize = 19;

pub type TableauPile = SmallVec<[Card; TABLEAU_SIZE]>;
pub type TalonPile = SmallVec<[Card; TALON_SIZE]>;
pub type FoundationPile = SmallVec<[Card; MAX_RANK as usize]>;

/// A single card. `id = suit * 13 + rank` with rank 0 (Ace) through 12 (King)
/// and suit 0..=3 in ♣♦♠♥ order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    id: u8,
    pub face_up: bool,
}

impl Card {
    pub fn new(rank: u8, suit: u8) -> Self {
        Self {
            id: suit * MAX_RANK + rank,
            face_up: false,
        }
    }

    pub fn new_with_id(id: u8) -> Self {
        Self { id, face_up: false }
    }

    pub fn parse(rank: char, suit: char) -> Result<Self> {
        let rank = RANKS
            .iter()
            .position(|&r| r == rank)
            .with_context(|| format!("Invalid rank at card {rank}{suit}"))?;
        let suit = SUITS
            .iter()
            .position(|&s| s == suit)
            .with_context(|| format!("Invalid suit at card {rank}{suit}"))?;
        Ok(Card::new(rank as u8, suit as u8))
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn rank(&self) -> u8 {
        self.id % MAX_RANK
    }

    pub fn suit(&self) -> u8 {
        self.id / MAX_RANK
    }

    pub fn is_red(&self) -> bool {
        self.suit() & 1 == 1
    }

    pub fn is_ace(&self) -> bool {
        self.rank() == 0
    }

    pub fn is_king(&self) -> bool {
        self.rank() == MAX_RANK - 1
    }

    pub fn to_pretty_string(&self) -> String {
        format!(
            "{}{}",
            RANKS[self.rank() as usize],
            SUITS[self.suit() as usize]
        )
    }
}

/// A fully specified game state: 7 tableau columns, face-down stock,
/// face-up waste, and 4 per-suit foundations (indexed by suit, holding the
/// whole ascending stack). The top of stock/waste is the last element.
#[derive(Debug, Clone, Default)]
pub struct Deal {
    pub tableaus: [TableauPile; TOTAL_TABLEAUS],
    pub stock: TalonPile,
    pub waste: TalonPile,
    pub foundations: [FoundationPile; TOTAL_FOUNDATIONS],
    draw_count: usize,
}

impl Deal {
    pub fn new(draw_count: usize) -> Self {
        Self {
            draw_count,
            ..Default::default()
        }
    }

    pub fn draw_count(&self) -> usize {
        if self.draw_count == 3 { 3 } else { 1 }
    }

    pub fn set_draw_count(&mut self, value: usize) {
        self.draw_count = value;
    }

    pub fn foundation_count(&self) -> usize {
        self.foundations.iter().map(|f| f.len()).sum()
    }

    pub fn is_won(&self) -> bool {
        self.foundation_count() == TOTAL_CARDS
    }

    /// A card may go home iff it is the next rank of its suit's foundation.
    pub fn can_add_to_foundation(&self, card: Card) -> bool {
        self.foundations[card.suit() as usize].len() == card.rank() as usize
    }

    /// A card may land on a column iff the column is empty and the card is a
    /// King, or the column's top is face-up, one rank higher, and of the
    /// opposite color.
    pub fn can_place_on_tableau(&self, tableau_idx: usize, card: Card) -> bool {
        match self.tableaus[tableau_idx].last() {
            None => card.is_king(),
            Some(top) => {
                top.face_up && top.rank() == card.rank() + 1 && top.is_red() != card.is_red()
            }
        }
    }

    /// Index of the first face-up card in a column, if any.
    pub fn face_up_start(&self, tableau_idx: usize) -> Option<usize> {
        self.tableaus[tableau_idx].iter().position(|c| c.face_up)
    }

    /// Turns the column's new top face-up after cards were removed above it.
    pub fn flip_top(&mut self, tableau_idx: usize) {
        if let Some(card) = self.tableaus[tableau_idx].last_mut() {
            card.face_up = true;
        }
    }

    /// Full structural validation: exactly the 52 distinct cards, stock all
    /// face-down, waste all face-up, foundations ascending from Ace in suit
    /// order, and each column's face-down cards forming a contiguous prefix.
    pub fn is_valid(&self) -> bool {
        let mut seen = [false; TOTAL_CARDS];
        let mut count = 0;
        let mut check_cards = |cards: &[Card]| -> bool {
            for card in cards {
                let id = card.id() as usize;
                if id >= TOTAL_CARDS || seen[id] {
                    return false;
                }
                seen[id] = true;
                count += 1;
            }
            true
        };

        if !check_cards(&self.stock) || !check_cards(&self.waste) {
            return false;
        }
        for foundation in &self.foundations {
            if !check_cards(foundation) {
                return false;
            }
        }
        for tableau in &self.tableaus {
            if !check_cards(tableau) {
                return false;
            }
        }
        if count != TOTAL_CARDS {
            return false;
        }

        if self.stock.iter().any(|c| c.face_up) || self.waste.iter().any(|c| !c.face_up) {
            return false;
        }
        for (suit, foundation) in self.foundations.iter().enumerate() {
            for (rank, card) in foundation.iter().enumerate() {
                if card.suit() as usize != suit || card.rank() as usize != rank {
                    return false;
                }
            }
        }
        for tableau in &self.tableaus {
            let boundary = tableau.iter().position(|c| c.face_up);
            if let Some(boundary) = boundary
                && tableau[boundary..].iter().any(|c| !c.face_up)
            {
                return false;
            }
        }
        true
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut deal: Self = Default::default();

        for line in content
            .split('\n')
            .map(|v| v.trim())
            .filter(|l| !l.is_empty())
        {
            let line_context = || format!("Failed to parse at '{line}'");
            if let Some(rest) = line.strip_prefix("Stock:") {
                for card in Self::parse_cards(rest.trim()).with_context(line_context)? {
                    deal.stock.push(card);
                }
            } else if let Some(rest) = line.strip_prefix("Waste:") {
                for mut card in Self::parse_cards(rest.trim()).with_context(line_context)? {
                    card.face_up = true;
                    deal.waste.push(card);
                }
            } else if let Some(rest) = line.strip_prefix("Foundation") {
                let mut parts = rest.splitn(2, ':');
                parts
                    .next()
                    .unwrap_or("")
                    .trim()
                    .parse::<usize>()
                    .context("Invalid foundation index")
                    .with_context(line_context)?;
                let cards = Self::parse_cards(parts.next().unwrap_or("").trim())
                    .with_context(line_context)?;
                if let Some(top) = cards.last() {
                    for rank in 0..=top.rank() {
                        let mut card = Card::new(rank, top.suit());
                        card.face_up = true;
                        deal.foundations[top.suit() as usize].push(card);
                    }
                }
            } else if let Some(rest) = line.strip_prefix("Tableau") {
                let mut parts = rest.splitn(2, ':');
                let idx = parts
                    .next()
                    .unwrap_or("")
                    .trim()
                    .parse::<usize>()
                    .context("Invalid tableau index")
                    .with_context(line_context)?;
                let idx = idx - 1;
                let cards_str = parts.next().unwrap_or("").trim();
                let (before, after) = if let Some(sep) = cards_str.find('|') {
                    let (b, a) = cards_str.split_at(sep);
                    (b, &a[1..])
                } else {
                    (cards_str, "")
                };
                for card in Self::parse_cards(before.trim()).with_context(line_context)? {
                    deal.tableaus[idx].push(card);
                }
                for mut card in Self::parse_cards(after.trim()).with_context(line_context)? {
                    card.face_up = true;
                    deal.tableaus[idx].push(card);
                }
            } else if let Some(rest) = line.strip_prefix("DrawCount:") {
                let value = rest
                    .trim()
                    .parse::<usize>()
                    .context("Invalid DrawCount")
                    .with_context(line_context)?;
                deal.set_draw_count(value);
            }
        }

        Ok(deal)
    }

    fn parse_cards(s: &str) -> Result<Vec<Card>> {
        let mut cards = Vec::new();
        let mut chars = s.chars().peekable();
        while let Some(&c1) = chars.peek() {
            if c1.is_whitespace() || c1 == '|' {
                chars.next();
                continue;
            }
            let rank = c1;
            chars.next();
            let suit = match chars.next() {
                Some(s) => s,
                None => break,
            };
            cards.push(Card::parse(rank, suit)?);
        }
        Ok(cards)
    }

    pub fn pretty_print(&self) -> String {
        let mut output = String::new();

        if !self.stock.is_empty() {
            output.push_str("Stock: ");
            for card in &self.stock {
                output.push_str(&card.to_pretty_string());
            }
            output.push('\n');
        }

        if !self.waste.is_empty() {
            output.push_str("Waste: ");
            for card in &self.waste {
                output.push_str(&card.to_pretty_string());
            }
            output.push('\n');
        }

        for (suit, foundation) in self.foundations.iter().enumerate() {
            if let Some(top) = foundation.last() {
                output.push_str(&format!(
                    "Foundation{}: {}\n",
                    suit + 1,
                    top.to_pretty_string()
                ));
            }
        }

        for (i, tableau) in self.tableaus.iter().enumerate() {
            if tableau.is_empty() {
                continue;
            }
            output.push_str(&format!("Tableau{}: ", i + 1));
            let sep = self.face_up_start(i).unwrap_or(tableau.len());
            for (j, card) in tableau.iter().enumerate() {
                if j == sep {
                    output.push('|');
                }
                output.push_str(&card.to_pretty_string());
            }
            output.push('\n');
        }

        output.push_str(&format!("DrawCount: {}", self.draw_count()));

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_encoding() {
        let card = Card::parse('Q', '♥').unwrap();
        assert_eq!(card.rank(), 11);
        assert_eq!(card.suit(), 3);
        assert!(card.is_red());
        assert!(!card.is_king());
        assert_eq!(card.to_pretty_string(), "Q♥");
    }

    #[test]
    fn test_foundation_legality() {
        let mut deal = Deal::new(1);
        let ace_clubs = Card::new(0, 0);
        let two_clubs = Card::new(1, 0);
        let three_clubs = Card::new(2, 0);

        assert!(deal.can_add_to_foundation(ace_clubs));
        deal.foundations[0].push(ace_clubs);
        assert!(!deal.can_add_to_foundation(three_clubs));
        assert!(deal.can_add_to_foundation(two_clubs));
    }

    #[test]
    fn test_tableau_placement() {
        let mut deal = Deal::new(1);
        assert!(deal.can_place_on_tableau(0, Card::new(12, 0)));
        assert!(!deal.can_place_on_tableau(0, Card::new(11, 0)));

        // 9♦ stacks on T♣ but T♦ and 9♣-on-T♠-face-down do not.
        let mut ten_clubs = Card::new(9, 0);
        ten_clubs.face_up = true;
        deal.tableaus[1].push(ten_clubs);
        assert!(deal.can_place_on_tableau(1, Card::new(8, 1)));
        assert!(!deal.can_place_on_tableau(1, Card::new(9, 1)));

        deal.tableaus[2].push(Card::new(9, 2));
        assert!(!deal.can_place_on_tableau(2, Card::new(8, 1)));
    }

    #[test]
    fn test_parse_roundtrip() {
        const DEAL_STR: &str = r#"Stock: 5♦2♥8♦K♣7♥J♣
Waste: 7♦Q♥K♥T♦6♣9♥K♦J♠T♣Q♣3♣2♦Q♦8♥6♥7♠8♠
Foundation1: 2♣
Foundation3: A♠
Tableau1: |5♣
Tableau2: J♥|6♠
Tableau3: T♠5♥|Q♠
Tableau4: 9♠T♥2♠|9♣
Tableau5: 7♣4♥3♠|A♦
Tableau6: 3♥3♦4♣5♠4♦|8♣
Tableau7: 6♦4♠A♥9♦K♠|J♦
DrawCount: 3"#;

        let deal = Deal::parse(DEAL_STR).unwrap();
        assert!(deal.is_valid());
        assert_eq!(deal.foundation_count(), 3);
        assert_eq!(deal.draw_count(), 3);
        assert_eq!(DEAL_STR, deal.pretty_print());
    }

    #[test]
    fn test_is_valid_rejects_duplicates() {
        let mut deal = Deal::new(1);
        for id in 0..TOTAL_CARDS as u8 {
            deal.stock.push(Card::new_with_id(id));
        }
        assert!(deal.is_valid());

        deal.stock.pop();
        deal.stock.push(Card::new_with_id(0));
        assert!(!deal.is_valid());
    }

    #[test]
    fn test_is_valid_rejects_buried_face_up() {
        let mut deal = Deal::new(1);
        for id in 0..50u8 {
            deal.stock.push(Card::new_with_id(id));
        }
        let mut up = Card::new_with_id(50);
        up.face_up = true;
        deal.tableaus[0].push(up);
        deal.tableaus[0].push(Card::new_with_id(51));
        assert!(!deal.is_valid());
    }
}
