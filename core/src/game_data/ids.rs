// this is exhaustive
pub mod event_type_id {
    pub const EVENT: u64 = 836045448945472;
    pub const SPEND: u64 = 836045448945473;
    pub const RESTORE: u64 = 836045448945476;
    pub const APPLY_EFFECT: u64 = 836045448945477;
    pub const REMOVE_EFFECT: u64 = 836045448945478;
    pub const AREA_ENTERED: u64 = 836045448953664;
    pub const DISCIPLINE_CHANGED: u64 = 836045448953665;
    pub const MODIFY_CHARGES: u64 = 836045448953666;
}

// common ones only, not exhaustive
pub mod action_id {
    pub const ABILITY_ACTIVATE: u64 = 836045448945479;
    pub const ABILITY_DEACTIVATE: u64 = 836045448945480;
    pub const ABILITY_CANCEL: u64 = 836045448945481;
    pub const ABILITY_INTERRUPT: u64 = 836045448945482;
    pub const MODIFY_THREAT: u64 = 836045448945483;
    pub const FALLING_DAMAGE: u64 = 836045448945484;
    pub const TAUNT: u64 = 836045448945488;
    pub const ENTER_COMBAT: u64 = 836045448945489;
    pub const EXIT_COMBAT: u64 = 836045448945490;
    pub const DEATH: u64 = 836045448945493;
    pub const REVIVED: u64 = 836045448945494;
    pub const FAILED_EFFECT: u64 = 836045448945499;
    pub const HEAL: u64 = 836045448945500;
    pub const DAMAGE: u64 = 836045448945501;
    pub const TARGET_SET: u64 = 836045448953668;
    pub const TARGET_CLEARED: u64 = 836045448953669;
}
