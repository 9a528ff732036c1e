quantity!(Cost, "€");

impl Cost {
    pub const ONE_CENT: Self = Self(0.01);
}
