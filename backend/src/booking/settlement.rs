//! Driver payout arithmetic shared by booking confirmation and incidents

use serde::Serialize;

/// What a booking is worth once the platform takes its per-seat fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub gross: i64,
    pub platform_fee: i64,
    pub driver_payout: i64,
}

impl Settlement {
    /// `seats × price − seats × fee`, never below zero
    pub fn for_booking(price: i32, seats: i32, fee_per_seat: i64) -> Self {
        let seats = i64::from(seats);
        let gross = i64::from(price) * seats;
        let platform_fee = fee_per_seat * seats;
        Self {
            gross,
            platform_fee,
            driver_payout: (gross - platform_fee).max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_seat_payout() {
        let settlement = Settlement::for_booking(20, 1, 2);
        assert_eq!(settlement.gross, 20);
        assert_eq!(settlement.platform_fee, 2);
        assert_eq!(settlement.driver_payout, 18);
    }

    #[test]
    fn test_fee_scales_with_seats() {
        assert_eq!(Settlement::for_booking(15, 3, 2).driver_payout, 39);
    }

    #[test]
    fn test_fee_larger_than_price() {
        assert_eq!(Settlement::for_booking(10, 1, 12).driver_payout, 0);
    }
}
