/// Weapon blocks that take part in firing animations

/// Firing type codes shared with the renderer's `FiringKind`
pub const FIRING_BALLISTIC: u8 = 1;
pub const FIRING_LASER: u8 = 2;
pub const FIRING_PARTICLE: u8 = 3;
pub const FIRING_FLAME: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiringMount {
    pub guid: &'static str,
    pub name: &'static str,
    pub kind: u8,
    /// Muzzle sits at the end of a stack of barrel blocks
    pub barrel_chain: bool,
}

const fn simple(guid: &'static str, name: &'static str, kind: u8) -> FiringMount {
    FiringMount {
        guid,
        name,
        kind,
        barrel_chain: false,
    }
}

const fn barrel(guid: &'static str, name: &'static str, kind: u8) -> FiringMount {
    FiringMount {
        guid,
        name,
        kind,
        barrel_chain: true,
    }
}

pub const FIRING_MOUNTS: &[FiringMount] = &[
    simple("c94e1719-bcc7-4c6a-8563-505fad2f9db9", "16 pounder", FIRING_BALLISTIC),
    simple("58305289-16ea-43cf-9144-2f23b383da81", "32 pounder", FIRING_BALLISTIC),
    simple("e1d1bcae-f5e4-42bb-9781-6dde51b8e390", "64 pounder", FIRING_BALLISTIC),
    simple("16b67fbc-25d5-4a35-a0df-4941e7abf6ef", "Revolving Blast-Gun", FIRING_BALLISTIC),
    simple("d3e8e14a-58e7-4bdd-b1b3-0f37e4723a73", "Shard cannon", FIRING_BALLISTIC),
    simple("2311e4db-a281-448f-ad53-0a6127573a96", "60mm Grenade Launcher", FIRING_BALLISTIC),
    simple("742f063f-d0fe-4f41-8717-a2c75c38d5e0", "30mm Assault Cannon", FIRING_BALLISTIC),
    simple("9b8657b9-c820-43a0-ad19-25ea45a100f1", "60mm Auto Cannon", FIRING_BALLISTIC),
    simple("f9f36cb3-cbfd-446a-9313-40f8e31e6e89", "3.7\" Gun", FIRING_BALLISTIC),
    simple("1217043c-e786-4555-ba24-46cd1f458bf9", "3.7\" Gun Shield", FIRING_BALLISTIC),
    simple("0aa0fa2e-1a85-4493-9c4c-0a69c385395d", "130mm Casemate", FIRING_BALLISTIC),
    simple("aa070f63-c454-4f95-82fd-d946a32a1b66", "150mm Casemate", FIRING_BALLISTIC),
    simple("5cf2b4da-c1b8-4005-930b-73cc39ac9d28", "Simple Laser", FIRING_LASER),
    simple("2fd4fd83-3125-4825-b596-f78ef36375c2", "Flamethrower Back", FIRING_FLAME),
    simple("a5ad3190-f3ff-4cfd-860a-9f7328482271", "Flamethrower Bottom", FIRING_FLAME),
    barrel("dc8f69fe-f97c-404f-996c-1b934afa17b5", "Advanced Firing Piece", FIRING_BALLISTIC),
    barrel("a97e03b0-e8da-49e2-9913-ad8c1826d869", "Firing Piece", FIRING_BALLISTIC),
    barrel("fd2b6afb-da6f-4a8e-bfc0-e4202b87300d", "Short Range Laser Combiner", FIRING_LASER),
    barrel("7dc67bed-fd0f-4145-9525-5840bbcc4822", "Laser Combiner", FIRING_LASER),
    barrel("9896747c-39a5-43bc-8ba9-ccf2f645cca1", "PAC Lens (symmetric)", FIRING_PARTICLE),
    barrel("1a1c9de5-6db5-4092-97ac-a4883383fadd", "Small PAC Lens (cross inputs)", FIRING_PARTICLE),
    barrel("2e429412-2982-4335-bf3c-a6c6609c8cbf", "Small PAC Lens (rear inputs)", FIRING_PARTICLE),
    barrel("2eea241a-6a32-41c6-a9e4-d082c7e854de", "PAC Lens (rear inputs)", FIRING_PARTICLE),
    barrel("f1746662-adec-4054-98bd-94b553bc6c6d", "Particle Accelerator Lens", FIRING_PARTICLE),
    barrel("3d82f1a3-ad2a-4e81-a4e3-cb88c968f6e9", "Particle Cannon", FIRING_PARTICLE),
];

pub fn find_firing_mount(guid: &str) -> Option<&'static FiringMount> {
    FIRING_MOUNTS.iter().find(|m| m.guid == guid)
}

/// Upper bound on barrel blocks walked when searching for a muzzle
pub const BARREL_MARCH_LIMIT: usize = 100;

/// Material name marking catalog misses, barrel marching stops on it
pub const MISSING_MATERIAL: &str = "Missing";
