//! Combat styles and disciplines as they appear in DisciplineChanged events.
//!
//! Maps the 64-bit ids from the log to typed classes/disciplines and the
//! group role (Tank, Healer, DPS) each discipline fills.

use serde::{Deserialize, Serialize};

/// Role a character fills in group content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    #[default]
    Unknown,
    Dps,
    Healer,
    Tank,
}

/// The eight base combat styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatClass {
    // Republic
    Trooper,
    Smuggler,
    JediKnight,
    JediConsular,
    // Empire
    BountyHunter,
    ImperialAgent,
    SithWarrior,
    SithInquisitor,
}

impl CombatClass {
    pub fn from_id(id: u64) -> Option<Self> {
        use CombatClass::*;
        match id {
            16140999253208197512 => Some(Trooper),
            16140997055451521365 => Some(Smuggler),
            16141007844876951097 => Some(JediKnight),
            16140903134212196743 => Some(JediConsular),
            16140911277033332389 => Some(BountyHunter),
            16140905232405801950 => Some(ImperialAgent),
            16141153526575710780 => Some(SithWarrior),
            16141122432429723681 => Some(SithInquisitor),
            _ => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        use CombatClass::*;
        match self {
            Trooper => "Trooper",
            Smuggler => "Smuggler",
            JediKnight => "Jedi Knight",
            JediConsular => "Jedi Consular",
            BountyHunter => "Bounty Hunter",
            ImperialAgent => "Imperial Agent",
            SithWarrior => "Sith Warrior",
            SithInquisitor => "Sith Inquisitor",
        }
    }
}

/// Character discipline (specialization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Discipline {
    // Trooper / Bounty Hunter
    Gunnery,
    CombatMedic,
    AssaultSpecialist,
    Arsenal,
    Bodyguard,
    InnovativeOrdnance,
    Tactics,
    ShieldSpecialist,
    Plasmatech,
    AdvancedPrototype,
    ShieldTech,
    Pyrotech,
    // Smuggler / Imperial Agent
    Sharpshooter,
    Saboteur,
    DirtyFighting,
    Marksmanship,
    Engineering,
    Virulence,
    Scrapper,
    Sawbones,
    Ruffian,
    Concealment,
    Lethality,
    Medicine,
    // Jedi Knight / Sith Warrior
    Watchman,
    Combat,
    Concentration,
    Annihilation,
    Carnage,
    Fury,
    Vigilance,
    Defense,
    Focus,
    Vengeance,
    Immortal,
    Rage,
    // Jedi Consular / Sith Inquisitor
    Telekinetics,
    Balance,
    Seer,
    Lightning,
    Madness,
    Corruption,
    Infiltration,
    Serenity,
    KineticCombat,
    Deception,
    Hatred,
    Darkness,
}

impl Discipline {
    /// Look up a discipline from the id carried in the log.
    pub fn from_id(id: u64) -> Option<Self> {
        use Discipline::*;
        match id {
            // Trooper / Bounty Hunter
            3088803483451154 => Some(Gunnery),
            1610854127306954 => Some(CombatMedic),
            3739871355530330 => Some(AssaultSpecialist),
            594992886408418 => Some(Arsenal),
            2203256920318106 => Some(Bodyguard),
            3507396390530202 => Some(InnovativeOrdnance),
            1944502563654938 => Some(Tactics),
            3007101716805754 => Some(ShieldSpecialist),
            1944487867571386 => Some(Plasmatech),
            3320456030634170 => Some(AdvancedPrototype),
            1929098417348794 => Some(ShieldTech),
            3320419469872442 => Some(Pyrotech),
            // Smuggler / Imperial Agent
            3508869182982330 => Some(Sharpshooter),
            3322083181395130 => Some(Saboteur),
            1946011866315962 => Some(DirtyFighting),
            3225114604527898 => Some(Marksmanship),
            2031374702903449 => Some(Engineering),
            3109089216887066 => Some(Virulence),
            2487504318513466 => Some(Scrapper),
            2487567242063162 => Some(Sawbones),
            2485828043867450 => Some(Ruffian),
            2031360302985517 => Some(Concealment),
            2031339142381593 => Some(Lethality),
            1932232264187162 => Some(Medicine),
            // Jedi Knight / Sith Warrior
            3508879977426106 => Some(Watchman),
            3218632854835386 => Some(Combat),
            3218654353789114 => Some(Concentration),
            3219155620896954 => Some(Annihilation),
            3219159918885050 => Some(Carnage),
            595034142806330 => Some(Fury),
            2484207912698170 => Some(Vigilance),
            1929098417479866 => Some(Defense),
            1944538822886714 => Some(Focus),
            2205476972965178 => Some(Vengeance),
            1913582031199546 => Some(Immortal),
            3300945127303354 => Some(Rage),
            // Jedi Consular / Sith Inquisitor
            1944553467445562 => Some(Telekinetics),
            3219158918873786 => Some(Balance),
            3218621659655354 => Some(Seer),
            3300941827327162 => Some(Lightning),
            2487654488367418 => Some(Madness),
            583093866373434 => Some(Corruption),
            3008608613884234 => Some(Infiltration),
            3219148223905914 => Some(Serenity),
            3218586805260602 => Some(KineticCombat),
            2031354002985099 => Some(Deception),
            2487472243868986 => Some(Hatred),
            1930851419333946 => Some(Darkness),
            _ => None,
        }
    }

    /// Group role of the discipline. Everything not tanking or healing deals
    /// damage.
    pub const fn role(&self) -> Role {
        use Discipline::*;
        match self {
            ShieldSpecialist | ShieldTech | Defense | Immortal | KineticCombat | Darkness => {
                Role::Tank
            }
            CombatMedic | Bodyguard | Sawbones | Medicine | Seer | Corruption => Role::Healer,
            _ => Role::Dps,
        }
    }

    pub const fn name(&self) -> &'static str {
        use Discipline::*;
        match self {
            Gunnery => "Gunnery",
            CombatMedic => "Combat Medic",
            AssaultSpecialist => "Assault Specialist",
            Arsenal => "Arsenal",
            Bodyguard => "Bodyguard",
            InnovativeOrdnance => "Innovative Ordnance",
            Tactics => "Tactics",
            ShieldSpecialist => "Shield Specialist",
            Plasmatech => "Plasmatech",
            AdvancedPrototype => "Advanced Prototype",
            ShieldTech => "Shield Tech",
            Pyrotech => "Pyrotech",
            Sharpshooter => "Sharpshooter",
            Saboteur => "Saboteur",
            DirtyFighting => "Dirty Fighting",
            Marksmanship => "Marksmanship",
            Engineering => "Engineering",
            Virulence => "Virulence",
            Scrapper => "Scrapper",
            Sawbones => "Sawbones",
            Ruffian => "Ruffian",
            Concealment => "Concealment",
            Lethality => "Lethality",
            Medicine => "Medicine",
            Watchman => "Watchman",
            Combat => "Combat",
            Concentration => "Concentration",
            Annihilation => "Annihilation",
            Carnage => "Carnage",
            Fury => "Fury",
            Vigilance => "Vigilance",
            Defense => "Defense",
            Focus => "Focus",
            Vengeance => "Vengeance",
            Immortal => "Immortal",
            Rage => "Rage",
            Telekinetics => "Telekinetics",
            Balance => "Balance",
            Seer => "Seer",
            Lightning => "Lightning",
            Madness => "Madness",
            Corruption => "Corruption",
            Infiltration => "Infiltration",
            Serenity => "Serenity",
            KineticCombat => "Kinetic Combat",
            Deception => "Deception",
            Hatred => "Hatred",
            Darkness => "Darkness",
        }
    }
}
